//! Account commands: whoami and API-key rotation.

use anyhow::Result;

use crate::guard;
use crate::models::User;
use crate::session::Session;

pub async fn run_whoami(session: &Session) -> Result<()> {
    let user = guard::require_user(session).await?;
    print_user(&user);
    Ok(())
}

pub async fn run_rotate_key(session: &Session) -> Result<()> {
    guard::require_user(session).await?;
    let user = session.rotate_key().await?;

    match user.api_key {
        Some(ref key) => {
            println!("API key rotated. The previous key is now invalid.");
            println!();
            println!("  {}", key);
            println!();
            println!("Store it now; it will not be shown again.");
        }
        None => println!("API key rotated, but the backend did not return the new key."),
    }
    Ok(())
}

fn print_user(user: &User) {
    println!("id:         {}", if user.id.is_empty() { "(unknown)" } else { &user.id });
    println!("email:      {}", user.email);
    println!(
        "name:       {}",
        if user.name.is_empty() { "(unknown)" } else { &user.name }
    );
    if let Some(created) = user.created_at {
        println!("created_at: {}", created.format("%Y-%m-%dT%H:%M:%SZ"));
    }
}
