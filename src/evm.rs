use log::{debug, info, warn};

use ballot_box::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::args::{AdminCommand, Args, Command};
use crate::evm::config_reader::*;
use crate::evm::io_csv::*;

mod config_reader;
mod io_csv;

#[derive(Debug, Snafu)]
pub enum EvmError {
    #[snafu(display("Error opening configuration file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration file {path}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Ballot { source: BallotError },
    #[snafu(display("Invalid admin password!"))]
    InvalidPassword {},
    #[snafu(display("No admin password is configured, the admin commands are disabled"))]
    AdminDisabled {},
    #[snafu(display("A vote weight of {weight} requires the special vote password"))]
    SpecialVoteDenied { weight: u64 },
    #[snafu(display("Cannot understand choice {choice:?}, expected <position>=<candidate>"))]
    ParsingChoice { choice: String },
    #[snafu(display("Error writing CSV to {path}"))]
    WritingCsv { source: csv::Error, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type EvmResult<T> = Result<T, EvmError>;

fn check_admin(config: &ElectionConfig, password: &str) -> EvmResult<()> {
    let expected = config
        .admin_password
        .as_deref()
        .context(AdminDisabledSnafu)?;
    ensure!(expected == password, InvalidPasswordSnafu);
    Ok(())
}

fn check_weight(config: &ElectionConfig, weight: u64, password: Option<&str>) -> EvmResult<()> {
    if weight == 1 {
        return Ok(());
    }
    match (config.special_vote_password.as_deref(), password) {
        (Some(expected), Some(given)) if expected == given => Ok(()),
        _ => SpecialVoteDeniedSnafu { weight }.fail(),
    }
}

fn parse_choice(choice: &str) -> EvmResult<(String, String)> {
    match choice.split_once('=') {
        Some((position, candidate)) if !position.trim().is_empty() => {
            Ok((position.trim().to_string(), candidate.trim().to_string()))
        }
        _ => ParsingChoiceSnafu { choice }.fail(),
    }
}

fn build_ballot(voter_id: &str, choices: &[String], skips: &[String], weight: u64) -> EvmResult<Ballot> {
    let mut ballot = Ballot::new(voter_id).with_weight(weight);
    for c in choices {
        let (position, candidate) = parse_choice(c)?;
        ballot = ballot.choose(&position, &candidate);
    }
    for s in skips {
        ballot = ballot.skip(s.trim());
    }
    debug!("build_ballot: {:?}", ballot);
    Ok(ballot)
}

fn print_candidates(store: &Store) {
    let roster: Roster = store.load();
    let symbols: SymbolTable = store.load();
    if roster.is_empty() {
        println!("No positions defined yet.");
    }
    for p in roster.positions() {
        println!("### {}", p.name);
        if p.candidates.is_empty() {
            println!("No candidates added for this position yet.");
        }
        for (idx, c) in p.candidates.iter().enumerate() {
            match symbols.existing_path(c) {
                Some(sym) => println!("{}. {} [{}]", idx + 1, c, sym.display()),
                None => println!("{}. {}", idx + 1, c),
            }
        }
    }
}

fn print_status(store: &Store, voter_id: &str) {
    let roster: Roster = store.load();
    let ledger = Ledger::new(store);
    for p in roster.positions() {
        if ledger.has_voted(voter_id, &p.name) {
            println!("{}: already voted", p.name);
        } else {
            println!("{}: open", p.name);
        }
    }
}

fn print_receipt(receipt: &BallotReceipt) {
    for p in receipt.cast.iter() {
        println!("Vote recorded for {}", p);
    }
    for p in receipt.already_voted.iter() {
        println!("You have already voted for {}", p);
    }
    for p in receipt.skipped.iter() {
        println!("Skipped {}", p);
    }
    if !receipt.cast.is_empty() {
        println!("Thank you! Your votes have been recorded successfully!");
    }
}

fn print_results(res: &ElectionResults) {
    for p in res.positions.iter() {
        println!("### {}", p.name);
        if p.tally.is_empty() {
            println!("No candidates for this position");
            continue;
        }
        for (candidate, votes) in p.standings() {
            println!("{:>6}  {}", votes, candidate);
        }
        match p.leader() {
            Some((name, votes)) => println!("Leading: {} with {} votes", name, votes),
            None => println!("No votes cast yet for this position"),
        }
    }
}

fn print_voters(roll: &VoterRoll) {
    if roll.is_empty() {
        println!("No voters have cast their votes yet.");
        return;
    }
    for v in roll.voters() {
        let positions = if v.positions.is_empty() {
            "None".to_string()
        } else {
            v.positions.join(", ")
        };
        println!("{}: {}", v.voter_id, positions);
    }
}

fn run_admin(store: &Store, config: &ElectionConfig, command: &AdminCommand) -> EvmResult<()> {
    let admin = Admin::new(store).with_placeholder_positions(config.placeholder_positions());
    match command {
        AdminCommand::AddCandidate {
            position,
            candidate,
        } => {
            admin
                .add_candidate(position, candidate)
                .context(BallotSnafu)?;
            println!("Added {} to {}", candidate, position);
        }
        AdminCommand::RemoveCandidate {
            position,
            candidate,
        } => {
            admin
                .remove_candidate(position, candidate)
                .context(BallotSnafu)?;
            println!("Removed {} from {}", candidate, position);
        }
        AdminCommand::AddPosition { position } => {
            admin.add_position(position).context(BallotSnafu)?;
            println!("Added position {}", position);
        }
        AdminCommand::RemovePosition { position } => {
            admin.remove_position(position).context(BallotSnafu)?;
            println!("Removed position {}", position);
        }
        AdminCommand::RenamePosition { old, new } => {
            admin.rename_position(old, new).context(BallotSnafu)?;
            println!("Renamed '{}' to '{}'", old, new);
        }
        AdminCommand::SetSymbol { candidate, path } => {
            admin.set_symbol(candidate, path).context(BallotSnafu)?;
            if !Path::new(path).exists() {
                warn!("Symbol file {:?} does not exist (yet)", path);
            }
            println!("Added/Updated symbol for {}", candidate);
        }
        AdminCommand::RemoveSymbol { candidate } => {
            if admin.remove_symbol(candidate).context(BallotSnafu)? {
                println!("Removed symbol for {}", candidate);
            } else {
                println!("No symbol added for {}", candidate);
            }
        }
        AdminCommand::Results => print_results(&admin.results()),
        AdminCommand::Voters => print_voters(&admin.voters()),
        AdminCommand::Reset {
            everything,
            confirm,
        } => {
            if !*confirm {
                whatever!("This action will permanently delete all voting data: pass --confirm to proceed")
            }
            let scope = if *everything {
                ResetScope::Everything
            } else {
                ResetScope::VotesOnly
            };
            admin.reset(scope).context(BallotSnafu)?;
            match scope {
                ResetScope::VotesOnly => println!("All votes have been reset!"),
                ResetScope::Everything => println!("All election data has been reset!"),
            }
        }
        AdminCommand::Export { out } => {
            let rows = admin.export();
            if rows.is_empty() {
                println!("No voting data available to export.");
                return Ok(());
            }
            let total: u64 = rows.iter().map(|r| r.votes).sum();
            let target = export_target(out.as_deref(), &Local::now().naive_local());
            export_results(&target, &rows)?;
            if let ExportTarget::File(p) = &target {
                println!("Results written to {}", p.display());
            }
            info!("Total votes cast: {}", total);
        }
    }
    Ok(())
}

/// The data directory: the command line wins over the configuration file.
fn data_directory(args: &Args, config: &ElectionConfig) -> PathBuf {
    match &args.data_dir {
        Some(d) => PathBuf::from(d),
        None => config.data_directory(args.config.as_deref()),
    }
}

pub fn run(args: &Args) -> EvmResult<()> {
    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => ElectionConfig::default(),
    };
    let data_dir = data_directory(args, &config);
    info!(
        "{}: using data directory {:?}",
        config.election_name(),
        data_dir
    );
    let store = Store::open(data_dir);
    store
        .initialize(&config.initial_roster())
        .context(BallotSnafu)?;

    match &args.command {
        Command::Init => {
            for kind in DocumentKind::ALL {
                let p = store.path(kind);
                let state = if p.exists() { "ok" } else { "not created yet" };
                println!("{}: {}", p.display(), state);
            }
        }
        Command::Candidates => print_candidates(&store),
        Command::Vote {
            voter_id,
            choices,
            skips,
            weight,
            special_password,
        } => {
            check_weight(&config, *weight, special_password.as_deref())?;
            let ballot = build_ballot(
                voter_id.as_deref().unwrap_or(""),
                choices,
                skips,
                *weight,
            )?;
            let receipt = Ledger::new(&store).submit(&ballot).context(BallotSnafu)?;
            print_receipt(&receipt);
        }
        Command::Status { voter_id } => print_status(&store, voter_id),
        Command::Admin { password, command } => {
            check_admin(&config, password)?;
            run_admin(&store, &config, command)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};
    use tempfile::TempDir;

    fn write_config(dir: &TempDir) -> String {
        let p = dir.path().join("election.json");
        fs::write(
            &p,
            r#"{
                "dataDirectory": "store",
                "adminPassword": "admin",
                "specialVotePassword": "staff",
                "placeholderPositions": 2,
                "initialCandidates": {"CM": ["A", "B"], "DCM": ["C"]}
            }"#,
        )
        .unwrap();
        p.to_str().unwrap().to_string()
    }

    fn evm(config: &str, rest: &[&str]) -> EvmResult<()> {
        let mut argv = vec!["evm", "--config", config];
        argv.extend_from_slice(rest);
        run(&Args::parse_from(argv))
    }

    fn store(dir: &TempDir) -> Store {
        Store::open(dir.path().join("store"))
    }

    #[test]
    fn choices() {
        assert_eq!(
            parse_choice("Chief Minister = Arya Naik").unwrap(),
            ("Chief Minister".to_string(), "Arya Naik".to_string())
        );
        assert_eq!(
            parse_choice("CM=A=B").unwrap(),
            ("CM".to_string(), "A=B".to_string())
        );
        assert!(matches!(
            parse_choice("CM"),
            Err(EvmError::ParsingChoice { .. })
        ));
        assert!(matches!(
            parse_choice("=A"),
            Err(EvmError::ParsingChoice { .. })
        ));
    }

    #[test]
    fn passwords() {
        let config = ElectionConfig {
            admin_password: Some("admin".to_string()),
            special_vote_password: Some("staff".to_string()),
            ..ElectionConfig::default()
        };
        assert!(check_admin(&config, "admin").is_ok());
        assert!(matches!(
            check_admin(&config, "Admin"),
            Err(EvmError::InvalidPassword {})
        ));
        assert!(matches!(
            check_admin(&ElectionConfig::default(), ""),
            Err(EvmError::AdminDisabled {})
        ));

        assert!(check_weight(&config, 1, None).is_ok());
        assert!(check_weight(&config, 3, Some("staff")).is_ok());
        assert!(check_weight(&config, 3, Some("admin")).is_err());
        assert!(check_weight(&ElectionConfig::default(), 2, Some("")).is_err());
    }

    #[test]
    fn vote_then_export() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(&dir);
        evm(&config, &["vote", "--voter-id", "V1", "--choice", "CM=A", "--skip", "DCM"]).unwrap();
        evm(&config, &["vote", "--voter-id", "V1", "--choice", "CM=B"]).unwrap();
        evm(
            &config,
            &[
                "vote",
                "--voter-id",
                "T1",
                "--choice",
                "CM=B",
                "--weight",
                "3",
                "--special-password",
                "staff",
            ],
        )
        .unwrap();

        let res = results(&store(&dir));
        assert_eq!(res.get("CM", "A"), Some(1));
        assert_eq!(res.get("CM", "B"), Some(3));
        assert_eq!(res.get("DCM", "C"), Some(0));

        let out = dir.path().join("results.csv");
        evm(
            &config,
            &["admin", "--password", "admin", "export", "--out", out.to_str().unwrap()],
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(out).unwrap(),
            "Position,Candidate,Votes\nCM,A,1\nCM,B,3\nDCM,C,0\n"
        );
    }

    #[test]
    fn vote_without_voter_id_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(&dir);
        let res = evm(&config, &["vote", "--choice", "CM=A"]);
        assert!(matches!(
            res,
            Err(EvmError::Ballot {
                source: BallotError::MissingVoterId {}
            })
        ));
        assert!(store(&dir).load::<VoteTally>().is_empty());
    }

    #[test]
    fn weighted_vote_needs_password() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(&dir);
        let res = evm(
            &config,
            &["vote", "--voter-id", "V1", "--choice", "CM=A", "--weight", "5"],
        );
        assert!(matches!(res, Err(EvmError::SpecialVoteDenied { weight: 5 })));
        assert!(store(&dir).load::<VoteTally>().is_empty());
    }

    #[test]
    fn admin_commands() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(&dir);
        let admin = |rest: &[&str]| {
            let mut argv = vec!["admin", "--password", "admin"];
            argv.extend_from_slice(rest);
            evm(&config, &argv)
        };
        assert!(matches!(
            evm(&config, &["admin", "--password", "nope", "results"]),
            Err(EvmError::InvalidPassword {})
        ));

        admin(&["add-candidate", "CM", "D"]).unwrap();
        assert!(admin(&["add-candidate", "CM", "D"]).is_err());
        admin(&["rename-position", "DCM", "Deputy"]).unwrap();
        admin(&["add-position", "HM"]).unwrap();
        admin(&["remove-candidate", "CM", "A"]).unwrap();
        admin(&["results"]).unwrap();
        admin(&["voters"]).unwrap();
        assert_eq!(
            store(&dir).load::<Roster>(),
            Roster::new()
                .with_position("CM", &["B", "D"])
                .with_position("Deputy", &["C"])
                .with_position("HM", &[])
        );

        evm(&config, &["vote", "--voter-id", "V1", "--choice", "CM=B"]).unwrap();
        assert!(admin(&["reset"]).is_err());
        assert_eq!(store(&dir).load::<VoteTally>().total(), 1);
        admin(&["reset", "--confirm"]).unwrap();
        assert!(store(&dir).load::<VoteTally>().is_empty());
        assert_eq!(store(&dir).load::<Roster>().len(), 3);

        admin(&["reset", "--everything", "--confirm"]).unwrap();
        assert_eq!(store(&dir).load::<Roster>(), Roster::placeholders(2));
    }

    #[test]
    fn data_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(&dir);
        let other = dir.path().join("other");
        let args = Args::parse_from([
            "evm",
            "--config",
            config.as_str(),
            "--data-dir",
            other.to_str().unwrap(),
            "init",
        ]);
        run(&args).unwrap();
        assert!(other.join("candidates.json").exists());
        assert!(!dir.path().join("store").exists());
    }

    #[test]
    fn every_admin_command_has_help() {
        let cmd = Args::command();
        let admin = cmd.find_subcommand("admin").unwrap();
        let mut count = 0;
        for sub in admin.get_subcommands().filter(|s| s.get_name() != "help") {
            assert!(
                sub.get_about().map_or(false, |a| !a.is_empty()),
                "no help for {}",
                sub.get_name()
            );
            count += 1;
        }
        assert_eq!(count, 11);
    }
}
