use std::path::{Path, PathBuf};

mod terminal;

use chrono::Utc;
use clap::ArgAction;
use sitrep::{
    Config, EntryStatus, IncidentState, IncidentStore, TeamRoster, TimelineEntry, derivation,
    report,
    service::{
        CommsRequest, HttpTextService, RewriteRequest, SummaryKind, TextService, call_with_retry,
    },
};
use terminal::Colorize;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the tool root (holds config.toml and the state directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command.run(&self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Print the incident's analysis report
    Show(Show),

    /// Add, edit or remove timeline entries
    #[command(subcommand)]
    Entry(Entry),

    /// Page a team out and record the action on the timeline
    Callout(Callout),

    /// Publish a Condition/Action/Need report to the timeline
    Can(Can),

    /// Manage the callable team roster
    Teams(Teams),

    /// Export the incident as a plain-text state dump
    Export(Export),

    /// Import an incident from a plain-text state dump
    Import(Import),

    /// Summarize the incident through the text service
    Analyze(Analyze),

    /// Correct grammar and style through the text service
    Correct(Rewrite),

    /// Simplify text for a non-technical audience through the text service
    Simplify(Rewrite),

    /// Draft a communication from an analysis through the text service
    Comms(Comms),
}

impl Command {
    fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Show(command) => command.run(root),
            Self::Entry(command) => command.run(root),
            Self::Callout(command) => command.run(root),
            Self::Can(command) => command.run(root),
            Self::Teams(command) => command.run(root),
            Self::Export(command) => command.run(root),
            Self::Import(command) => command.run(root),
            Self::Analyze(command) => command.run(root),
            Self::Correct(command) => command.run(root, RewriteKind::Correct),
            Self::Simplify(command) => command.run(root, RewriteKind::Simplify),
            Self::Comms(command) => command.run(root),
        }
    }
}

/// Shared handles to the stores under the configured state directory.
struct Context {
    config: Config,
    store: IncidentStore,
    roster: TeamRoster,
}

fn context(root: &Path) -> Context {
    let config = Config::load_or_default(root);
    let state_dir = root.join(&config.state_dir);
    Context {
        store: IncidentStore::new(state_dir.clone()),
        roster: TeamRoster::new(state_dir),
        config,
    }
}

fn load_required(store: &IncidentStore, incident: &str) -> anyhow::Result<IncidentState> {
    store
        .load(incident)?
        .ok_or_else(|| anyhow::anyhow!("No existing data found for incident {incident}"))
}

/// Re-derives the report fields and writes the record back.
fn rederive_and_save(
    store: &IncidentStore,
    incident: &str,
    state: &mut IncidentState,
) -> anyhow::Result<()> {
    if derivation::apply(&state.timeline_entries, &mut state.incident_details) {
        tracing::debug!("derived report fields updated for {incident}");
    }
    store.save(incident, state)?;
    Ok(())
}

#[derive(Debug, clap::Parser)]
pub struct Show {
    /// The incident number
    incident: String,
}

impl Show {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);
        let state = load_required(&ctx.store, &self.incident)?;
        print!(
            "{}",
            report::analysis_document(&state, Utc::now().date_naive())
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub enum Entry {
    /// Append a timestamped entry to the timeline
    Add(EntryAdd),

    /// Edit an existing entry in place
    Edit(EntryEdit),

    /// Remove an entry from the timeline
    Remove(EntryRemove),
}

impl Entry {
    fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Add(command) => command.run(root),
            Self::Edit(command) => command.run(root),
            Self::Remove(command) => command.run(root),
        }
    }
}

fn parse_status(s: &str) -> Result<EntryStatus, String> {
    s.parse().map_err(|e| format!("{e}"))
}

#[derive(Debug, clap::Parser)]
pub struct EntryAdd {
    /// The incident number
    incident: String,

    /// The entry status, e.g. 'Update' or 'Resolved Comms'
    #[clap(long, short, value_parser = parse_status)]
    status: EntryStatus,

    /// The entry notes
    #[clap(long, short, default_value = "")]
    notes: String,
}

impl EntryAdd {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);
        let mut state = ctx
            .store
            .load(&self.incident)?
            .unwrap_or_else(|| IncidentState::new(self.incident.clone()));

        let entry = TimelineEntry::new(self.status, self.notes);
        let timestamp = entry.timestamp.clone();
        state.timeline_entries.push(entry);
        rederive_and_save(&ctx.store, &self.incident, &mut state)?;

        println!(
            "{}",
            format!("Added {} entry at {timestamp}", self.status).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct EntryEdit {
    /// The incident number
    incident: String,

    /// The id of the entry to edit
    id: i64,

    /// Replace the entry status
    #[clap(long, short, value_parser = parse_status)]
    status: Option<EntryStatus>,

    /// Replace the entry notes
    #[clap(long, short)]
    notes: Option<String>,

    /// Replace the entry timestamp text
    #[clap(long, short)]
    timestamp: Option<String>,
}

impl EntryEdit {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);
        let mut state = load_required(&ctx.store, &self.incident)?;

        {
            let Some(entry) = state.entry_mut(self.id) else {
                anyhow::bail!("No timeline entry with id {} found", self.id);
            };
            if let Some(status) = self.status {
                entry.status = status;
            }
            if let Some(notes) = self.notes {
                entry.notes = notes;
            }
            if let Some(timestamp) = self.timestamp {
                entry.timestamp = timestamp;
            }
        }

        rederive_and_save(&ctx.store, &self.incident, &mut state)?;
        println!("{}", format!("Updated entry {}", self.id).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct EntryRemove {
    /// The incident number
    incident: String,

    /// The id of the entry to remove
    id: i64,
}

impl EntryRemove {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);
        let mut state = load_required(&ctx.store, &self.incident)?;

        if !state.remove_entry(self.id) {
            anyhow::bail!("No timeline entry with id {} found", self.id);
        }

        rederive_and_save(&ctx.store, &self.incident, &mut state)?;
        println!("{}", format!("Removed entry {}", self.id).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Callout {
    /// The incident number
    incident: String,

    /// The roster team to page out
    team: String,
}

impl Callout {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);

        let teams = ctx.roster.load()?;
        if !teams.iter().any(|team| team == &self.team) {
            anyhow::bail!(
                "'{}' is not in the team roster; add it with 'sitrep teams add'",
                self.team
            );
        }

        let mut state = load_required(&ctx.store, &self.incident)?;
        state.timeline_entries.push(TimelineEntry::new(
            EntryStatus::Action,
            format!("{} was paged out.", self.team),
        ));
        rederive_and_save(&ctx.store, &self.incident, &mut state)?;

        println!(
            "{}",
            format!("Call out sent, timeline updated for {}", self.incident).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Can {
    /// The incident number
    incident: String,

    /// The current situation, what happened, and what the impact is
    #[clap(long, short, default_value = "")]
    condition: String,

    /// The actions currently being taken
    #[clap(long, short, default_value = "")]
    action: String,

    /// The resources, support or information needed
    #[clap(long, short, default_value = "")]
    need: String,
}

impl Can {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        if self.condition.is_empty() && self.action.is_empty() && self.need.is_empty() {
            anyhow::bail!("Nothing to publish: fill in at least one of condition, action, need");
        }

        let ctx = context(root);
        let mut state = load_required(&ctx.store, &self.incident)?;

        let notes = format!(
            "Condition:\n{}\n\nAction:\n{}\n\nNeed:\n{}",
            self.condition, self.action, self.need
        );
        state
            .timeline_entries
            .push(TimelineEntry::new(EntryStatus::CanReport, notes));
        rederive_and_save(&ctx.store, &self.incident, &mut state)?;

        println!("{}", "CAN Report published".success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Teams {
    #[command(subcommand)]
    command: Option<TeamsCommand>,
}

#[derive(Debug, clap::Parser)]
enum TeamsCommand {
    /// List the roster (default)
    List,

    /// Add a team to the roster
    Add {
        /// The team name
        name: String,
    },

    /// Remove a team from the roster
    Remove {
        /// The team name
        name: String,
    },
}

impl Teams {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);

        match self.command.unwrap_or(TeamsCommand::List) {
            TeamsCommand::List => {
                let mut teams = ctx.roster.load()?;
                teams.sort();
                for team in &teams {
                    println!("{team}");
                }
                println!("{}", format!("{} teams", teams.len()).dim());
            }
            TeamsCommand::Add { name } => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    anyhow::bail!("Team name cannot be empty");
                }
                let mut teams = ctx.roster.load()?;
                if teams.contains(&name) {
                    anyhow::bail!("Team '{name}' already exists");
                }
                teams.push(name.clone());
                teams.sort();
                ctx.roster.save(&teams)?;
                println!("{}", format!("Added '{name}'").success());
            }
            TeamsCommand::Remove { name } => {
                let mut teams = ctx.roster.load()?;
                let before = teams.len();
                teams.retain(|team| team != &name);
                if teams.len() == before {
                    anyhow::bail!("Team '{name}' not found");
                }
                ctx.roster.save(&teams)?;
                println!("{}", format!("Removed '{name}'").success());
            }
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Export {
    /// The incident number
    incident: String,

    /// Where to write the dump (defaults to a name derived from the incident)
    #[clap(long, short)]
    output: Option<PathBuf>,
}

impl Export {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);
        let state = load_required(&ctx.store, &self.incident)?;

        let path = self
            .output
            .unwrap_or_else(|| PathBuf::from(report::export_file_name(&state)));
        std::fs::write(&path, report::state_dump(&state))?;

        println!("{}", format!("Exported to {}", path.display()).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Import {
    /// The state dump file to import
    file: PathBuf,
}

impl Import {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);
        let text = std::fs::read_to_string(&self.file)?;
        let mut state = report::parse_state_dump(&text)?;

        if state.title_incident.trim().is_empty() {
            anyhow::bail!("The dump does not name an incident number");
        }

        let incident = state.title_incident.clone();
        rederive_and_save(&ctx.store, &incident, &mut state)?;

        println!(
            "{}",
            format!(
                "State for {incident} loaded ({} timeline entries)",
                state.timeline_entries.len()
            )
            .success()
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ReportKindArg {
    /// The Technical Report
    Technical,
    /// The Post-Incident Review
    Pir,
}

impl From<ReportKindArg> for SummaryKind {
    fn from(kind: ReportKindArg) -> Self {
        match kind {
            ReportKindArg::Technical => Self::Technical,
            ReportKindArg::Pir => Self::Pir,
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Analyze {
    /// The incident number
    incident: String,

    /// Which report format to generate
    #[clap(long, short, value_enum, default_value = "technical")]
    kind: ReportKindArg,
}

impl Analyze {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);
        let state = load_required(&ctx.store, &self.incident)?;
        let document = report::analysis_document(&state, Utc::now().date_naive());

        let service = HttpTextService::new(&ctx.config.service)?;
        let summary = call_with_retry(|| service.summarize(&document, self.kind.into()))?;

        print!("{}", summary.render());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum RewriteKind {
    Correct,
    Simplify,
}

#[derive(Debug, clap::Parser)]
pub struct Rewrite {
    /// The text to transform (reads the file given with --file when omitted)
    text: Option<String>,

    /// Read the text from a file instead
    #[clap(long, short, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// The desired writing style, e.g. 'Formal' or 'Casual'
    #[clap(long, short)]
    style: Option<String>,

    /// A file of sample communications for the service to mimic
    #[clap(long, short)]
    knowledge_base: Option<PathBuf>,
}

impl Rewrite {
    #[instrument]
    fn run(self, root: &Path, kind: RewriteKind) -> anyhow::Result<()> {
        let ctx = context(root);
        let text = match (self.text, &self.file) {
            (Some(text), _) => text,
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => anyhow::bail!("Provide the text to transform, or --file"),
        };
        let knowledge_base = self
            .knowledge_base
            .map(|path| std::fs::read_to_string(path))
            .transpose()?;

        let request = RewriteRequest {
            text,
            style: self.style,
            knowledge_base,
        };
        let service = HttpTextService::new(&ctx.config.service)?;
        let output = call_with_retry(|| match kind {
            RewriteKind::Correct => service.correct_grammar(&request),
            RewriteKind::Simplify => service.simplify(&request),
        })?;

        println!("{output}");
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Comms {
    /// A file holding the incident analysis to base the communication on
    analysis: PathBuf,

    /// A file of sample communications for the service to mimic
    #[clap(long, short)]
    knowledge_base: Option<PathBuf>,
}

impl Comms {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ctx = context(root);
        let analysis = std::fs::read_to_string(&self.analysis)?;
        let knowledge_base = self
            .knowledge_base
            .map(|path| std::fs::read_to_string(path))
            .transpose()?;

        let request = CommsRequest {
            analysis,
            knowledge_base,
        };
        let service = HttpTextService::new(&ctx.config.service)?;
        let communication = call_with_retry(|| service.generate_comms(&request))?;

        println!("{communication}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn seed_incident(root: &Path, incident: &str) {
        let ctx = context(root);
        let state = IncidentState::new(incident.to_string());
        ctx.store.save(incident, &state).unwrap();
    }

    #[test]
    fn entry_add_creates_the_record_when_missing() {
        let tmp = tempdir().unwrap();

        let add = EntryAdd {
            incident: "INC0012345".to_string(),
            status: EntryStatus::Update,
            notes: "Team Falcon joined the call".to_string(),
        };
        add.run(tmp.path()).expect("entry add should succeed");

        let ctx = context(tmp.path());
        let state = ctx.store.load("INC0012345").unwrap().expect("saved");
        assert_eq!(state.timeline_entries.len(), 1);
        assert_eq!(
            state.incident_details.workgroups_engaged,
            "Team Falcon".to_string()
        );
    }

    #[test]
    fn callout_appends_an_action_entry_and_derives_the_team() {
        let tmp = tempdir().unwrap();
        seed_incident(tmp.path(), "INC1");

        let ctx = context(tmp.path());
        ctx.roster.save(&["Team Falcon".to_string()]).unwrap();

        let callout = Callout {
            incident: "INC1".to_string(),
            team: "Team Falcon".to_string(),
        };
        callout.run(tmp.path()).expect("callout should succeed");

        let state = ctx.store.load("INC1").unwrap().expect("saved");
        let entry = state.timeline_entries.last().expect("entry appended");
        assert_eq!(entry.status, EntryStatus::Action);
        assert_eq!(entry.notes, "Team Falcon was paged out.");
        assert_eq!(state.incident_details.workgroups_engaged, "Team Falcon");
    }

    #[test]
    fn callout_rejects_unknown_teams() {
        let tmp = tempdir().unwrap();
        seed_incident(tmp.path(), "INC1");

        let ctx = context(tmp.path());
        ctx.roster.save(&[]).unwrap();

        let callout = Callout {
            incident: "INC1".to_string(),
            team: "Nobody".to_string(),
        };
        assert!(callout.run(tmp.path()).is_err());
    }

    #[test]
    fn can_publish_appends_a_report_entry() {
        let tmp = tempdir().unwrap();
        seed_incident(tmp.path(), "INC1");

        let can = Can {
            incident: "INC1".to_string(),
            condition: "Checkout degraded".to_string(),
            action: "Cache being warmed".to_string(),
            need: "None".to_string(),
        };
        can.run(tmp.path()).expect("publish should succeed");

        let ctx = context(tmp.path());
        let state = ctx.store.load("INC1").unwrap().expect("saved");
        let entry = state.timeline_entries.last().expect("entry appended");
        assert_eq!(entry.status, EntryStatus::CanReport);
        assert_eq!(
            entry.notes,
            "Condition:\nCheckout degraded\n\nAction:\nCache being warmed\n\nNeed:\nNone"
        );
    }

    #[test]
    fn can_publish_requires_some_content() {
        let tmp = tempdir().unwrap();
        seed_incident(tmp.path(), "INC1");

        let can = Can {
            incident: "INC1".to_string(),
            condition: String::new(),
            action: String::new(),
            need: String::new(),
        };
        assert!(can.run(tmp.path()).is_err());
    }

    #[test]
    fn teams_add_rejects_duplicates_and_sorts() {
        let tmp = tempdir().unwrap();
        let ctx = context(tmp.path());
        ctx.roster.save(&["Zulu".to_string()]).unwrap();

        Teams {
            command: Some(TeamsCommand::Add {
                name: "Alpha".to_string(),
            }),
        }
        .run(tmp.path())
        .expect("add should succeed");

        assert_eq!(
            ctx.roster.load().unwrap(),
            vec!["Alpha".to_string(), "Zulu".to_string()]
        );

        let duplicate = Teams {
            command: Some(TeamsCommand::Add {
                name: "Alpha".to_string(),
            }),
        };
        assert!(duplicate.run(tmp.path()).is_err());
    }

    #[test]
    fn export_then_import_round_trips() {
        let tmp = tempdir().unwrap();

        EntryAdd {
            incident: "INC1".to_string(),
            status: EntryStatus::ResolvedComms,
            notes: "* Current update: All systems normal".to_string(),
        }
        .run(tmp.path())
        .unwrap();

        let dump_path = tmp.path().join("dump.txt");
        Export {
            incident: "INC1".to_string(),
            output: Some(dump_path.clone()),
        }
        .run(tmp.path())
        .unwrap();

        let ctx = context(tmp.path());
        let original = ctx.store.load("INC1").unwrap().expect("saved");

        // Wipe the record and bring it back from the dump.
        std::fs::remove_file(ctx.store.dir().join("inc1.json")).unwrap();
        Import { file: dump_path }.run(tmp.path()).unwrap();

        let restored = ctx.store.load("INC1").unwrap().expect("restored");
        assert_eq!(restored.timeline_entries, original.timeline_entries);
        assert_eq!(restored.incident_details, original.incident_details);
    }

    #[test]
    fn entry_remove_rederives_the_report_fields() {
        let tmp = tempdir().unwrap();

        EntryAdd {
            incident: "INC1".to_string(),
            status: EntryStatus::CausedByChange,
            notes: "CHG0012345".to_string(),
        }
        .run(tmp.path())
        .unwrap();

        let ctx = context(tmp.path());
        let state = ctx.store.load("INC1").unwrap().expect("saved");
        assert_eq!(state.incident_details.caused_by_change, "Yes - CHG0012345");
        let id = state.timeline_entries[0].id;

        EntryRemove {
            incident: "INC1".to_string(),
            id,
        }
        .run(tmp.path())
        .unwrap();

        let state = ctx.store.load("INC1").unwrap().expect("saved");
        assert_eq!(state.incident_details.caused_by_change, "No");
    }
}
