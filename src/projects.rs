//! Project commands: CRUD plus contributor management.
//!
//! Ownership rules (only the owner updates, deletes, or manages
//! contributors) are enforced by the backend; this side passes the 403/404
//! messages through unchanged.

use anyhow::Result;

use crate::guard;
use crate::session::Session;

pub async fn run_list(session: &Session) -> Result<()> {
    guard::require_user(session).await?;
    let projects = session.client().list_projects().await?;

    if projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }

    for project in &projects {
        println!(
            "{}  {}  (owner: {}, {} contributor{})",
            project.id,
            project.name,
            project.owner_name,
            project.contributors.len(),
            if project.contributors.len() == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

pub async fn run_create(session: &Session, name: &str, description: &str) -> Result<()> {
    guard::require_user(session).await?;
    let project = session.client().create_project(name, description).await?;
    println!("Created project {} ({})", project.name, project.id);
    Ok(())
}

pub async fn run_get(session: &Session, id: &str) -> Result<()> {
    guard::require_user(session).await?;
    let project = session.client().get_project(id).await?;

    println!("--- Project ---");
    println!("id:          {}", project.id);
    println!("name:        {}", project.name);
    println!("description: {}", project.description);
    println!("owner:       {} ({})", project.owner_name, project.owner_id);
    println!("created_at:  {}", project.created_at.format("%Y-%m-%dT%H:%M:%SZ"));
    println!("updated_at:  {}", project.updated_at.format("%Y-%m-%dT%H:%M:%SZ"));
    println!();

    println!("--- Contributors ({}) ---", project.contributors.len());
    for contributor in &project.contributors {
        println!(
            "{}  {}  <{}>",
            contributor.id, contributor.name, contributor.email
        );
    }
    Ok(())
}

pub async fn run_update(
    session: &Session,
    id: &str,
    name: Option<String>,
    description: Option<String>,
) -> Result<()> {
    guard::require_user(session).await?;
    if name.is_none() && description.is_none() {
        anyhow::bail!("Nothing to update. Pass --name and/or --description.");
    }
    let project = session
        .client()
        .update_project(id, name.as_deref(), description.as_deref())
        .await?;
    println!("Updated project {} ({})", project.name, project.id);
    Ok(())
}

pub async fn run_delete(session: &Session, id: &str) -> Result<()> {
    guard::require_user(session).await?;
    let receipt = session.client().delete_project(id).await?;
    println!("Deleted project {} ({})", receipt.project_id, receipt.status);
    Ok(())
}

pub async fn run_add_contributor(session: &Session, project_id: &str, email: &str) -> Result<()> {
    guard::require_user(session).await?;
    let receipt = session.client().add_contributor(project_id, email).await?;
    println!(
        "Added contributor {} <{}> to project {}",
        receipt.contributor.name, receipt.contributor.email, project_id
    );
    Ok(())
}

pub async fn run_remove_contributor(
    session: &Session,
    project_id: &str,
    user_id: &str,
) -> Result<()> {
    guard::require_user(session).await?;
    let receipt = session
        .client()
        .remove_contributor(project_id, user_id)
        .await?;
    println!(
        "Removed contributor {} from project {} ({})",
        receipt.user_id, project_id, receipt.status
    );
    Ok(())
}
