use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use common::{LatLng, Operator};
use std::path::PathBuf;
use tracing::{debug, trace};

pub mod commands;

use crate::app::App;
use crate::config::Settings;
use commands::{draw, panel, refresh, session};

#[derive(Parser)]
#[command(name = "geoweather")]
#[command(about = "Draw regions on a map and color them by historical weather")]
#[command(version)]
pub struct Cli {
    /// Settings file read on top of the built-in defaults and ./geoweather.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Apply the change without waiting for affected regions to be refetched
    #[arg(long, global = true)]
    pub no_fetch: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Print the dashboard and the map
    Show,
    /// Add a region (replaces an existing region with the same id)
    ///
    /// Vertices are `lat,lng` pairs, e.g. `draw lake 46.2,6.1 46.5,6.6 46.4,6.9`.
    Draw {
        id: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        vertices: Vec<LatLng>,
    },
    /// Replace the vertices of a region
    Edit {
        id: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        vertices: Vec<LatLng>,
    },
    /// Remove one or more regions
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Rename a region
    Rename {
        id: String,
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Edit the color rules of a region
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },
    /// Select the historical range (`YYYY-MM-DD`, inclusive)
    ///
    /// Both days are clamped into the allowed history window.
    Range { start: NaiveDate, end: NaiveDate },
    /// Fetch every region again
    Refresh,
    /// Read commands from stdin while fetches run in the background
    Session,
    /// Drop every region and restore the default ones
    Reset,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum RuleAction {
    /// Append a blank rule (`= 0`, white)
    Add { region: String },
    /// Change the operator, threshold or color of a rule
    Update {
        region: String,
        rule: String,
        /// One of <, <=, >, >=, = (or lt, le, gt, ge, eq)
        #[arg(long = "op")]
        operator: Option<Operator>,
        #[arg(long, allow_negative_numbers = true, value_parser = common::parse_finite)]
        value: Option<f64>,
        /// Hex color; the leading `#` may be left out
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a rule
    Remove { region: String, rule: String },
}

/// Commands typed inside a session: the same grammar without a binary name.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "session", disable_version_flag = true)]
pub struct SessionLine {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(self, settings: Settings) -> Result<()> {
        trace!("Running command {:?}", self.command);
        let mut app = App::open(&settings)?;

        if self.command == Commands::Session {
            return session::session(&mut app).await;
        }

        self.command.apply(&mut app)?;
        if self.no_fetch {
            debug!("Skipping fetches");
        } else {
            app.settle().await;
        }
        println!("{}", app.render());
        Ok(())
    }
}

impl Commands {
    /// Applies the command to the store. Fetches it makes necessary are left
    /// to the caller.
    pub fn apply(self, app: &mut App) -> Result<()> {
        match self {
            Commands::Show => Ok(()),
            Commands::Draw { id, vertices } => draw::draw(app, id, vertices),
            Commands::Edit { id, vertices } => draw::edit(app, id, vertices),
            Commands::Delete { ids } => draw::delete(app, ids),
            Commands::Rename { id, name } => panel::rename(app, id, name.join(" ")),
            Commands::Rule { action } => match action {
                RuleAction::Add { region } => panel::add_rule(app, region),
                RuleAction::Update {
                    region,
                    rule,
                    operator,
                    value,
                    color,
                } => panel::update_rule(app, region, rule, operator, value, color),
                RuleAction::Remove { region, rule } => panel::remove_rule(app, region, rule),
            },
            Commands::Range { start, end } => panel::select_range(app, start, end),
            Commands::Refresh => refresh::refresh(app),
            Commands::Reset => refresh::reset(app),
            Commands::Session => bail!("a session is already running"),
        }
    }
}
