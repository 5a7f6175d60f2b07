use clap::{Parser, Subcommand};

/// This is a voting machine for school elections.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration of the election: passwords, data directory and
    /// initial candidates. For more information about the file format, read the documentation of
    /// `ballot_box::manual`.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, optional) Where the election data is stored. Setting this option overrides the
    /// directory that may be specified with the --config option. Defaults to `data`.
    #[clap(short, long, value_parser)]
    pub data_dir: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Creates the data files that do not exist yet.
    Init,

    /// Lists the positions and the candidates running for them.
    Candidates,

    /// Casts the votes of one voter.
    Vote {
        /// (string) The identifier of the voter, e.g. STU001.
        #[clap(long, value_parser)]
        voter_id: Option<String>,

        /// (repeated) A choice, written as `<position>=<candidate>`.
        #[clap(long = "choice", value_parser)]
        choices: Vec<String>,

        /// (repeated) A position the voter does not want to vote for.
        #[clap(long = "skip", value_parser)]
        skips: Vec<String>,

        /// (default 1) The number of votes carried by each choice.
        #[clap(long, value_parser, default_value_t = 1)]
        weight: u64,

        /// (string) Required when the weight is not 1.
        #[clap(long, value_parser)]
        special_password: Option<String>,
    },

    /// Shows the positions a voter already voted for.
    Status {
        #[clap(long, value_parser)]
        voter_id: String,
    },

    /// Management commands, protected by the admin password.
    Admin {
        #[clap(long, value_parser)]
        password: String,

        #[clap(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// Adds a candidate at the end of a position's list.
    AddCandidate {
        #[clap(value_parser)]
        position: String,
        #[clap(value_parser)]
        candidate: String,
    },
    /// Removes a candidate. Their votes are kept but no longer shown.
    RemoveCandidate {
        #[clap(value_parser)]
        position: String,
        #[clap(value_parser)]
        candidate: String,
    },
    /// Adds a position without candidates.
    AddPosition {
        #[clap(value_parser)]
        position: String,
    },
    /// Removes a position and its candidate list.
    RemovePosition {
        #[clap(value_parser)]
        position: String,
    },
    /// Renames a position. Votes already cast stay attached to the old name.
    RenamePosition {
        #[clap(value_parser)]
        old: String,
        #[clap(value_parser)]
        new: String,
    },
    /// Records the path of the image shown next to a candidate.
    SetSymbol {
        #[clap(value_parser)]
        candidate: String,
        #[clap(value_parser)]
        path: String,
    },
    /// Forgets the image of a candidate.
    RemoveSymbol {
        #[clap(value_parser)]
        candidate: String,
    },
    /// Prints the standings of every position.
    Results,
    /// Prints the voters and the positions they voted for.
    Voters,
    /// Deletes all the votes and voters.
    Reset {
        /// Also replaces the candidates with empty placeholder positions.
        #[clap(long, takes_value = false)]
        everything: bool,
        /// Required: this action cannot be undone.
        #[clap(long, takes_value = false)]
        confirm: bool,
    },
    /// Writes the results as CSV.
    Export {
        /// (file path, directory or 'stdout') Defaults to election_results_<date>_<time>.csv
        /// in the current directory.
        #[clap(short, long, value_parser)]
        out: Option<String>,
    },
}
