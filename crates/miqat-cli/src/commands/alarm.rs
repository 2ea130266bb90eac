use clap::Subcommand;
use miqat_core::Boundary;

use crate::app::App;

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Print the alarm flags as JSON
    List,
    /// Turn an alarm on (dawn, midday or sunset)
    Enable { boundary: Boundary },
    /// Turn an alarm off
    Disable { boundary: Boundary },
}

pub fn run(action: AlarmAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let store = app.alarms();

    match action {
        AlarmAction::List => {
            let set = store.load()?;
            println!("{}", serde_json::to_string_pretty(&set)?);
        }
        AlarmAction::Enable { boundary } => {
            store.set(boundary, true)?;
            println!("{} alarm enabled", boundary.label());
        }
        AlarmAction::Disable { boundary } => {
            store.set(boundary, false)?;
            println!("{} alarm disabled", boundary.label());
        }
    }
    Ok(())
}
