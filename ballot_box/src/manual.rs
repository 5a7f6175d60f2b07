/*!

This is the long-form manual for `ballot_box` and the `evm` command line tool.

## Data files

All the election data is kept in one directory (`data` by default):

| file                     | content                                             |
|--------------------------|-----------------------------------------------------|
| `candidates.json`        | position name -> list of candidate names            |
| `votes.json`             | `"<position>_<candidate>"` -> number of votes       |
| `voters.json`            | voter id -> list of positions already voted for     |
| `candidate_symbols.json` | candidate name -> path to an image                  |

```json
{
  "Head Student": ["Anna", "Bob"],
  "Sports Captain": []
}
```

A file that is missing or cannot be read is treated as empty, with a
warning in the log. A damaged file does not stop the voting. It also means that the
next write replaces the damaged file, so keep a copy of the directory if
something looks wrong.

Votes are keyed by position name. Renaming a position or removing a
candidate does not move or delete the votes already cast: they stay in
`votes.json` but are no longer shown in the results.

## Configuration

`evm` reads an optional JSON configuration file (`--config`):

```json
{
  "electionName": "School Elections",
  "dataDirectory": "data",
  "adminPassword": "change me",
  "specialVotePassword": "change me too",
  "placeholderPositions": 10,
  "initialCandidates": {
    "Head Student": ["Anna", "Bob"]
  }
}
```

- `dataDirectory` (optional, default `data`): relative paths are resolved
  from the directory of the configuration file. `--data-dir` overrides it.
- `adminPassword` (optional): required by all the `admin` commands. Without
  it, the admin commands are disabled.
- `specialVotePassword` (optional): required to cast a vote with a weight
  other than 1.
- `placeholderPositions` (optional, default 10): number of empty positions
  created by `admin reset --everything`.
- `initialCandidates` (optional): the roster written by `evm init` when no
  candidates file exists yet.

## Voting

```bash
evm vote --voter-id STU001 --choice "Head Student=Anna" --skip "Sports Captain"
```

The voter id is free text. Spaces around it are removed, so `" STU001 "` and
`"STU001"` are the same voter; an id made only of spaces is refused. A voter
can vote once per position. Choices for positions the voter already voted
for are ignored and reported. A ballot that names an unknown position
or candidate is rejected as a whole.

## Results

`evm admin --password ... results` prints the standings per position.
`evm admin --password ... export` writes a CSV file with the columns
`Position`, `Candidate` and `Votes`, named
`election_results_<date>_<time>.csv` unless `--out` is given.

 */
