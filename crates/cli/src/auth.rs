//! Interactive first-time authentication (SPEC_FULL §6, surrounding
//! collaborator).
//!
//! Grounded on `auth.py`: connect, request a login code if not already
//! authorized, prompt for the SMS code on stdin, and handle the 2FA
//! password prompt if `sign_in` reports one is required.

use std::io::Write;

use grammers_client::{Client, Config as ClientConfig, InitParams, SignInError};
use grammers_session::Session;
use tracing::info;

use crate::app::{AppContext, AppError};

fn prompt(label: &str) -> std::io::Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub async fn run_auth(ctx: &AppContext) -> Result<(), AppError> {
    let session = Session::load_file_or_create(ctx.session_path())
        .map_err(|e| AppError::Telegram(e.to_string()))?;

    let client = Client::connect(ClientConfig {
        session,
        api_id: ctx.credentials.api_id,
        api_hash: ctx.credentials.api_hash.clone(),
        params: InitParams::default(),
    })
    .await
    .map_err(|e| AppError::Telegram(e.to_string()))?;

    if client
        .is_authorized()
        .await
        .map_err(|e| AppError::Telegram(e.to_string()))?
    {
        info!("already authorized");
        println!("Already authorized.");
        return Ok(());
    }

    let token = client
        .request_login_code(&ctx.credentials.phone)
        .await
        .map_err(|e| AppError::Telegram(e.to_string()))?;

    let code = prompt("Enter the code you received: ").map_err(|e| AppError::Telegram(e.to_string()))?;

    match client.sign_in(&token, &code).await {
        Ok(user) => print_signed_in(&user),
        Err(SignInError::PasswordRequired(password_token)) => {
            let password = prompt("Two-step verification password: ")
                .map_err(|e| AppError::Telegram(e.to_string()))?;
            let user = client
                .check_password(password_token, password)
                .await
                .map_err(|e| AppError::Telegram(e.to_string()))?;
            print_signed_in(&user);
        }
        Err(e) => return Err(AppError::Telegram(e.to_string())),
    }

    client
        .session()
        .save_to_file(ctx.session_path())
        .map_err(|e| AppError::Telegram(e.to_string()))?;

    Ok(())
}

fn print_signed_in(user: &grammers_client::types::User) {
    println!(
        "Signed in as: {} (@{})",
        user.first_name(),
        user.username().unwrap_or("-")
    );
}
