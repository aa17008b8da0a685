use anyhow::Context;
use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::{
    downloads::{repo::DownloadStore, repo_types::Download},
    error::ApiResult,
    expenses::{repo::ExpenseStore, repo_types::Expense},
    state::AppState,
};

/// A stored export with a freshly presigned URL.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadLink {
    pub id: i64,
    #[serde(rename = "fileURL")]
    pub file_url: String,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    date: String,
    category: &'a str,
    description: &'a str,
    amount: i64,
}

pub fn expenses_csv(expenses: &[Expense]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for e in expenses {
        wtr.serialize(CsvRow {
            date: e.date.to_string(),
            category: &e.category,
            description: &e.description,
            amount: e.amount,
        })?;
    }
    wtr.into_inner().context("flush csv writer")
}

fn object_key(user_id: i64, at: OffsetDateTime) -> String {
    format!(
        "exports/{}/expenses-{}-{}.csv",
        user_id,
        at.unix_timestamp(),
        uuid::Uuid::new_v4().simple()
    )
}

async fn link(state: &AppState, d: Download) -> ApiResult<DownloadLink> {
    let file_url = state
        .storage
        .presign_get(&d.object_key, state.config.storage.download_ttl_secs)
        .await?;
    Ok(DownloadLink {
        id: d.id,
        file_url,
        created_at: d.created_at,
    })
}

/// Upload every expense of the user as CSV and remember the object.
pub async fn export(state: &AppState, user_id: i64) -> ApiResult<DownloadLink> {
    let expenses = state.store.list_expenses(user_id).await?;
    let body = Bytes::from(expenses_csv(&expenses)?);
    let key = object_key(user_id, OffsetDateTime::now_utc());

    state.storage.put_object(&key, body, "text/csv").await?;

    let download = match state.store.record_download(user_id, &key).await {
        Ok(d) => d,
        Err(e) => {
            // Best effort: don't leave an orphaned object behind.
            if let Err(del) = state.storage.delete_object(&key).await {
                error!(error = %del, key = %key, "cleanup of export failed");
            }
            return Err(e.into());
        }
    };

    info!(user_id, key = %key, rows = expenses.len(), "expenses exported");
    link(state, download).await
}

pub async fn history(state: &AppState, user_id: i64) -> ApiResult<Vec<DownloadLink>> {
    let mut links = Vec::new();
    for d in state.store.list_downloads(user_id).await? {
        links.push(link(state, d).await?);
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{
        expenses::repo_types::ExpenseInput,
        test_utils::{test_context, test_user},
    };

    #[tokio::test]
    async fn export_uploads_all_expenses() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        for (category, amount) in [("Food", 120), ("Fuel, car", 80)] {
            ctx.store
                .add_expense(
                    user.id,
                    &ExpenseInput {
                        date: date!(2024 - 02 - 03),
                        category: category.into(),
                        description: "x".into(),
                        amount,
                    },
                )
                .await
                .unwrap();
        }

        let link = export(&ctx.state, user.id).await.unwrap();
        assert!(link.file_url.starts_with("https://fake.local/exports/"));

        let objects = ctx.storage.objects();
        assert_eq!(objects.len(), 1);
        let (key, body, content_type) = &objects[0];
        assert!(key.starts_with(&format!("exports/{}/", user.id)));
        assert_eq!(content_type, "text/csv");

        let text = String::from_utf8(body.to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,category,description,amount"));
        assert_eq!(lines.clone().count(), 2);
        assert!(text.contains("2024-02-03,Food,x,120"));
        assert!(text.contains("\"Fuel, car\""));

        let listed = history(&ctx.state, user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, link.id);
    }

    #[tokio::test]
    async fn failed_upload_records_nothing() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        ctx.storage.fail_puts(true);

        assert!(export(&ctx.state, user.id).await.is_err());
        assert!(history(&ctx.state, user.id).await.unwrap().is_empty());
    }

    #[test]
    fn link_serializes_with_file_url() {
        let link = DownloadLink {
            id: 1,
            file_url: "https://x/y".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let v = serde_json::to_value(&link).unwrap();
        assert_eq!(v["fileURL"], "https://x/y");
        assert_eq!(v["createdAt"], "1970-01-01T00:00:00Z");
    }
}
