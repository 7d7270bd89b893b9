use serde::Serialize;
use spin_sdk::http::{Request, Response};

use crate::auth::authenticate;
use crate::config::NOTIFICATIONS_KEY;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, new_id, no_content, now};
use crate::core::query_params::{get_string, parse_query_params};
use crate::core::store::{read_collection, write_collection, RecordStore};
use crate::models::models::{NewNotification, Notification, NotificationKind};

/// All notifications, newest first.
pub fn list_notifications(store: &dyn RecordStore) -> anyhow::Result<Vec<Notification>> {
    read_collection(store, NOTIFICATIONS_KEY)
}

pub fn add_notification(
    store: &dyn RecordStore,
    data: NewNotification,
) -> anyhow::Result<Notification> {
    let mut notifications = list_notifications(store)?;
    let notification = Notification {
        id: new_id(),
        kind: data.kind,
        text: data.text,
        post_id: data.post_id,
        read: false,
        created_at: now(),
    };
    notifications.insert(0, notification.clone());
    write_collection(store, NOTIFICATIONS_KEY, &notifications)?;
    Ok(notification)
}

pub fn mark_as_read(
    store: &dyn RecordStore,
    notification_id: &str,
) -> anyhow::Result<Option<Notification>> {
    let mut notifications = list_notifications(store)?;
    let Some(notification) = notifications.iter_mut().find(|n| n.id == notification_id) else {
        return Ok(None);
    };
    notification.read = true;
    let updated = notification.clone();
    write_collection(store, NOTIFICATIONS_KEY, &notifications)?;
    Ok(Some(updated))
}

pub fn clear_all(store: &dyn RecordStore) -> anyhow::Result<()> {
    write_collection::<Notification>(store, NOTIFICATIONS_KEY, &[])
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct NotificationSummary {
    pub total: usize,
    pub unread: usize,
    pub likes: usize,
    pub comments: usize,
    pub shares: usize,
}

pub fn summarize(notifications: &[Notification]) -> NotificationSummary {
    let count = |kind: NotificationKind| notifications.iter().filter(|n| n.kind == kind).count();
    NotificationSummary {
        total: notifications.len(),
        unread: notifications.iter().filter(|n| !n.read).count(),
        likes: count(NotificationKind::Like),
        comments: count(NotificationKind::Comment),
        shares: count(NotificationKind::Share),
    }
}

// === HTTP Handlers ===

pub fn handle_list_notifications(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    if let Err(e) = authenticate(store, &req) {
        return Ok(e.into());
    }

    let params = parse_query_params(&req.uri());
    let kind = match get_string(&params, "type").as_deref() {
        None | Some("all") => None,
        Some(raw) => match raw.parse::<NotificationKind>() {
            Ok(kind) => Some(kind),
            Err(e) => return Ok(ApiError::BadRequest(e.to_string()).into()),
        },
    };

    let notifications: Vec<Notification> = list_notifications(store)?
        .into_iter()
        .filter(|n| kind.map_or(true, |k| n.kind == k))
        .collect();

    json_response(200, &notifications)
}

pub fn handle_summary(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    if let Err(e) = authenticate(store, &req) {
        return Ok(e.into());
    }
    json_response(200, &summarize(&list_notifications(store)?))
}

pub fn handle_mark_read(
    store: &dyn RecordStore,
    req: Request,
    notification_id: &str,
) -> anyhow::Result<Response> {
    if let Err(e) = authenticate(store, &req) {
        return Ok(e.into());
    }
    match mark_as_read(store, notification_id)? {
        Some(n) => json_response(200, &n),
        None => Ok(ApiError::NotFound("Notification not found".to_string()).into()),
    }
}

pub fn handle_clear(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    if let Err(e) = authenticate(store, &req) {
        return Ok(e.into());
    }
    clear_all(store)?;
    tracing::debug!("cleared notifications");
    Ok(no_content())
}
