use clap::Subcommand;
use miqat_core::Boundary;

use crate::app::App;

#[derive(Subcommand)]
pub enum AdjustAction {
    /// Print every boundary's offset in minutes as JSON
    List,
    /// Set one boundary's offset
    Set {
        /// pre_dawn, dawn, midday, sunset or midnight
        boundary: Boundary,
        /// Minutes, -25 to 25
        #[arg(allow_negative_numbers = true)]
        minutes: i32,
    },
    /// Clear all offsets
    Reset,
}

pub fn run(action: AdjustAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let store = app.adjustments();

    match action {
        AdjustAction::List => {
            let set = store.load()?;
            let map: serde_json::Map<String, serde_json::Value> = Boundary::ALL
                .into_iter()
                .map(|b| (b.name().to_string(), set.get(b).into()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        AdjustAction::Set { boundary, minutes } => {
            store.set(boundary, minutes)?;
            println!("{} adjusted by {minutes:+} minutes", boundary.label());
        }
        AdjustAction::Reset => {
            store.reset()?;
            println!("adjustments cleared");
        }
    }
    Ok(())
}
