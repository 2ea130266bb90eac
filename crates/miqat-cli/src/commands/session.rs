use clap::Subcommand;

use crate::app::App;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Sign in; settings from now on are kept per user
    Login { user: String },
    /// Sign out; the user's settings stay for the next login
    Logout,
    /// Print the signed-in user
    Status,
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;

    match action {
        SessionAction::Login { user } => {
            app.store.start_session(&user)?;
            println!("signed in as {user}");
        }
        SessionAction::Logout => match app.store.active_user() {
            Some(user) => {
                app.store.end_session()?;
                println!("signed out {user}");
            }
            None => println!("no active session"),
        },
        SessionAction::Status => match app.store.active_user() {
            Some(user) => println!("{user}"),
            None => println!("no active session"),
        },
    }
    Ok(())
}
