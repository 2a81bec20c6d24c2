use gameday::config::TokenFiles;
use gameday::google_calendar::TokenManager;
use gameday::startup;

#[tokio::main]
async fn main() -> miette::Result<()> {
    startup::init_logging()?;

    // No calendar or season settings are needed to authorize
    let files = TokenFiles::load();
    let token_manager = TokenManager::new(&files.token_file, &files.client_secret_file);

    let token = token_manager.force_consent().await?;

    println!("Token successfully saved to {}!", files.token_file.display());
    if token.refresh_token.is_none() {
        println!("No refresh token was issued; revoke the app's access and run this again to get one.");
    }

    Ok(())
}
