use clap::Subcommand;
use miqat_core::geo::Resolution;
use miqat_core::Coordinate;

use crate::app::App;

#[derive(Subcommand)]
pub enum LocationAction {
    /// Print the location in use as JSON
    Show,
    /// Ask the device for a new position
    Detect,
    /// Use a fixed position
    Set {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
}

fn print(resolution: &Resolution) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(notice) = resolution.notice() {
        eprintln!("{notice}");
    }
    println!("{}", serde_json::to_string_pretty(resolution)?);
    Ok(())
}

pub async fn run(action: LocationAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let resolver = app.resolver();

    match action {
        LocationAction::Show => print(&resolver.resolve().await?),
        LocationAction::Detect => print(&resolver.redetect().await?),
        LocationAction::Set {
            latitude,
            longitude,
        } => {
            let coordinate = Coordinate::new(latitude, longitude);
            if !coordinate.is_valid() {
                return Err(format!("not a valid position: {coordinate}").into());
            }
            print(&resolver.set_manual(coordinate)?)
        }
    }
}
