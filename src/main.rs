use clap::{Parser, Subcommand};
use log::*;
use opsnode_roster::logging;
use opsnode_roster::roster::*;
use opsnode_roster::squad::SquadTopology;
use opsnode_roster::FileSegments;
use std::fs;
use std::path::{Path, PathBuf};

/// Maintain an operations roster stored on disk.
#[derive(Parser)]
#[command(name = "opsnode", version)]
struct Opts {
    /// Directory holding the roster segments.
    #[arg(long, default_value = ".opsnode")]
    store: PathBuf,

    /// JSON topology file; the built-in four squads are used when omitted.
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the roster in slot order.
    List,

    /// Print roster counts and squad occupancy.
    Summary {
        #[arg(long)]
        json: bool,
    },

    /// Recruit a new unit.
    Recruit {
        archetype: Archetype,

        #[arg(long)]
        callsign: Option<String>,

        /// Preferred squad id, or "auto".
        #[arg(long)]
        squad: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        project_tag: Option<String>,
    },

    /// Edit fields of an existing unit.
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        callsign: Option<String>,

        #[arg(long)]
        archetype: Option<Archetype>,

        #[arg(long)]
        squad: Option<String>,

        #[arg(long)]
        slot: Option<usize>,

        #[arg(long)]
        project_tag: Option<String>,

        #[arg(long)]
        status: Option<UnitStatus>,

        #[arg(long)]
        enabled: Option<bool>,
    },

    /// Remove a unit, recording a snapshot first.
    Delete { id: String },

    /// Apply enable, disable, pause or resume to several units.
    Batch {
        action: BatchAction,

        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Record the current roster for rollback.
    Snapshot,

    /// Restore the most recent snapshot.
    Rollback,

    /// List recorded snapshots, newest first.
    History,
}

fn load_topology(path: Option<&Path>) -> Result<SquadTopology, String> {
    match path {
        Some(path) => {
            let data = fs::read_to_string(path).map_err(|e| format!("Failed to read topology {}: {}", path.display(), e))?;

            SquadTopology::from_json(&data)
        }
        None => Ok(SquadTopology::default()),
    }
}

fn print_units(units: &[Unit]) {
    let mut ordered: Vec<&Unit> = units.iter().collect();
    ordered.sort_by_key(|unit| unit.slot_index);

    println!("{:>4}  {:<8} {:<18} {:<9} {:<8} {:<3} {:<18} {}", "SLOT", "SQUAD", "CALLSIGN", "ROLE", "STATUS", "ON", "TAG", "NAME");

    for unit in ordered {
        println!(
            "{:>4}  {:<8} {:<18} {:<9} {:<8} {:<3} {:<18} {} ({})",
            unit.slot_index.map(|slot| slot.to_string()).unwrap_or_default(),
            unit.squad_id,
            unit.callsign,
            unit.archetype.label(),
            unit.status.name(),
            if unit.enabled { "yes" } else { "no" },
            unit.project_tag,
            unit.name,
            unit.id
        );
    }
}

fn main() -> Result<(), String> {
    let opts = Opts::parse();

    logging::setup_logging(match opts.verbose {
        0 => logging::Warn,
        1 => logging::Info,
        _ => logging::Debug,
    });

    let topology = load_topology(opts.topology.as_deref())?;
    let segments = FileSegments::open(&opts.store)?;

    info!("Opening roster in {}", opts.store.display());

    let mut store = RosterStore::open(topology, segments);

    match opts.command {
        Command::List => print_units(store.units()),
        Command::Summary { json } => {
            let summary = store.summary();

            if json {
                println!("{}", serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?);
            } else {
                println!("{}", summary);

                for squad in &summary.squads {
                    println!("  {:<16} {}/{}", squad.name, squad.occupied, squad.capacity);
                }
            }
        }
        Command::Recruit {
            archetype,
            callsign,
            squad,
            name,
            project_tag,
        } => {
            let draft = UnitDraft {
                callsign,
                squad,
                name,
                project_tag,
                ..UnitDraft::new(archetype)
            };

            let recruitment = store.recruit(draft);

            println!("{}", recruitment.notice);
        }
        Command::Update {
            id,
            name,
            callsign,
            archetype,
            squad,
            slot,
            project_tag,
            status,
            enabled,
        } => {
            let patch = UnitPatch {
                name,
                callsign,
                archetype,
                squad_id: squad,
                slot_index: slot,
                project_tag,
                status,
                enabled,
                ..UnitPatch::default()
            };

            if patch.is_empty() {
                return Err("Nothing to update".to_string());
            }

            if !store.update(&id, patch) {
                return Err(format!("Unknown unit: {}", id));
            }

            if let Some(unit) = store.unit(&id) {
                print_units(std::slice::from_ref(unit));
            }
        }
        Command::Delete { id } => {
            let notice = store.delete(&id).ok_or_else(|| format!("Cannot delete {} - unknown unit or last unit on the roster", id))?;

            println!("{}", notice);
        }
        Command::Batch { action, ids } => println!("{}", store.batch(&ids, action)),
        Command::Snapshot => {
            store.snapshot();

            let timestamp = store.history().latest().map(|snapshot| snapshot.timestamp).unwrap_or_default();

            println!("Recorded snapshot {} ({} stored)", timestamp, store.history().len());
        }
        Command::Rollback => {
            let notice = store.rollback().ok_or("No snapshots to roll back to")?;

            println!("{}", notice);
        }
        Command::History => {
            if store.history().is_empty() {
                println!("No snapshots recorded");
            }

            for (index, snapshot) in store.history().iter().enumerate() {
                let callsigns = snapshot.roster.iter().map(|unit| unit.callsign.as_str()).collect::<Vec<_>>().join(", ");

                println!("{:>2}  {}  {} bots  {}", index, snapshot.timestamp, snapshot.roster.len(), callsigns);
            }
        }
    }

    Ok(())
}
