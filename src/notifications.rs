// ABOUTME: New-recipe digest mails for users who opted in to notifications
// ABOUTME: Triggered externally through the internal app, never on a timer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use chrono::{Duration, Utc};
use recipe_core::errors::AppResult;
use serde::Serialize;
use tracing::info;

use crate::database::recipes::RecentRecipe;
use crate::database::Database;
use crate::email::{EmailContext, EmailKind, EmailTemplates, Mailer, RecipeLink};

/// Outcome of one digest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestSummary {
    /// Recipes created within the range
    pub recipes: usize,
    /// Users who received a mail
    pub notified: usize,
}

/// Mail every opted-in, confirmed user the recipes created in the last
/// `range_days` days by somebody else
///
/// Users without such recipes get no mail. Delivery stops at the first
/// transport failure.
///
/// # Errors
///
/// Returns `UNABLE_TO_SEND_EMAIL` if a mail cannot be delivered, or a
/// database error if loading recipes or users fails
#[tracing::instrument(skip(db, mailer, templates, app_url))]
pub async fn send_digest(
    db: &Database,
    mailer: &dyn Mailer,
    templates: &EmailTemplates,
    app_url: &str,
    range_days: i64,
) -> AppResult<DigestSummary> {
    let since = Utc::now() - Duration::days(range_days);
    let recipes = db.recipes().created_since(since).await?;
    let mut summary = DigestSummary {
        recipes: recipes.len(),
        notified: 0,
    };
    if recipes.is_empty() {
        info!("No new recipes, digest skipped");
        return Ok(summary);
    }

    for user in db.users().notification_recipients().await? {
        let links = recipes_by_others(&recipes, user.id);
        if links.is_empty() {
            continue;
        }

        let context = EmailContext::new(
            app_url,
            &user.username,
            user.first_name.as_deref(),
            user.last_name.as_deref(),
        )
        .with_recipes(links);
        let message = templates.render(EmailKind::Notification, &user.email, &context)?;
        mailer.send(message).await?;
        summary.notified += 1;
    }

    info!(
        recipes = summary.recipes,
        notified = summary.notified,
        "Notification digest sent"
    );
    Ok(summary)
}

fn recipes_by_others(recipes: &[RecentRecipe], user_id: i64) -> Vec<RecipeLink> {
    recipes
        .iter()
        .filter(|recipe| recipe.creator_id != user_id)
        .map(|recipe| RecipeLink {
            id: recipe.id,
            name: recipe.name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_recipes_are_skipped() {
        let recipes = vec![
            RecentRecipe { id: 1, name: "Mine".into(), creator_id: 7 },
            RecentRecipe { id: 2, name: "Theirs".into(), creator_id: 8 },
        ];
        let links = recipes_by_others(&recipes, 7);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, 2);
        assert!(recipes_by_others(&recipes[..1], 7).is_empty());
    }
}
