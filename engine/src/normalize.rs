//! Normalization of untrusted documents into a [`Snapshot`].
//!
//! [`normalize`] is total: any JSON value produces a snapshot. Missing
//! collections become empty, missing text becomes `""`, type mismatches fall
//! back to defaults and unknown fields are dropped. Documents written by the
//! previous dashboard version used Portuguese keys; those are accepted as
//! aliases so old exports and old local data keep loading. Within each
//! collection the first entry for an id wins; later duplicates are dropped.

use crate::model::{
    Brand, Episode, EpisodeStatus, Guest, GuestStatus, Snapshot, Social, Transaction,
    TransactionKind,
};
use crate::Timestamp;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Top-level keys that identify a snapshot-shaped object.
pub(crate) const SNAPSHOT_KEYS: &[&str] = &[
    "brand",
    "transactions",
    "guests",
    "episodes",
    "transacoes",
    "convidados",
    "episodios",
];

/// Repair any value into a well-formed snapshot.
pub fn normalize(raw: &Value) -> Snapshot {
    let Some(obj) = raw.as_object() else {
        return Snapshot::default();
    };

    Snapshot {
        brand: brand(obj.get("brand")),
        transactions: collection(obj, &["transactions", "transacoes"], transaction),
        guests: collection(obj, &["guests", "convidados"], guest),
        episodes: collection(obj, &["episodes", "episodios"], episode),
    }
}

/// Whether `value` looks like a bare snapshot rather than arbitrary JSON.
pub(crate) fn is_snapshot_shaped(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| SNAPSHOT_KEYS.iter().any(|k| obj.contains_key(*k)))
}

fn brand(raw: Option<&Value>) -> Brand {
    let Some(obj) = raw.and_then(Value::as_object) else {
        return Brand::default();
    };
    let social = obj.get("social").and_then(Value::as_object);
    let social_text = |key: &str| social.map(|s| text(s, &[key])).unwrap_or_default();

    Brand {
        name: text(obj, &["name"]),
        tagline: text(obj, &["tagline"]),
        social: Social {
            instagram: social_text("instagram"),
            youtube: social_text("youtube"),
            spotify: social_text("spotify"),
            email: social_text("email"),
            whatsapp: social_text("whatsapp"),
        },
    }
}

fn collection<T>(
    obj: &Map<String, Value>,
    keys: &[&str],
    entry: impl Fn(&Map<String, Value>, String) -> T,
) -> Vec<T> {
    let Some(items) = first(obj, keys).and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|item| {
            let id = text(item, &["id"]);
            (!id.is_empty() && seen.insert(id.clone())).then(|| entry(item, id))
        })
        .collect()
}

fn transaction(obj: &Map<String, Value>, id: String) -> Transaction {
    let kind = match text(obj, &["kind", "tipo"]).as_str() {
        "income" | "entrada" => TransactionKind::Income,
        _ => TransactionKind::Expense,
    };

    Transaction {
        id,
        kind,
        amount: amount(first(obj, &["amount", "valor"])),
        category: text(obj, &["category", "categoria"]),
        date: text(obj, &["date", "data"]),
        note: text(obj, &["note", "obs"]),
        created_at: timestamp(obj.get("createdAt")),
    }
}

fn guest(obj: &Map<String, Value>, id: String) -> Guest {
    let status = match text(obj, &["status"]).as_str() {
        "confirmed" | "confirmado" => GuestStatus::Confirmed,
        "declined" | "recusou" => GuestStatus::Declined,
        _ => GuestStatus::Pending,
    };

    Guest {
        id,
        name: text(obj, &["name", "nome"]),
        social_handle: text(obj, &["socialHandle", "insta"]),
        bio: text(obj, &["bio"]),
        contact: text(obj, &["contact", "contato"]),
        status,
        photo: text(obj, &["photo", "foto"]),
        created_at: timestamp(obj.get("createdAt")),
    }
}

fn episode(obj: &Map<String, Value>, id: String) -> Episode {
    let status = match text(obj, &["status"]).as_str() {
        "recorded" | "gravado" => EpisodeStatus::Recorded,
        "published" | "publicado" => EpisodeStatus::Published,
        _ => EpisodeStatus::Planned,
    };

    Episode {
        id,
        title: text(obj, &["title", "titulo"]),
        guest_name: text(obj, &["guestName", "convidado"]),
        date: text(obj, &["date", "data"]),
        status,
        link: text(obj, &["link"]),
        note: text(obj, &["note", "obs"]),
        thumbnail: text(obj, &["thumbnail", "thumb"]),
        created_at: timestamp(obj.get("createdAt")),
    }
}

/// First present, non-null value among `keys`. Canonical keys come first.
fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> String {
    first(obj, keys)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn amount(raw: Option<&Value>) -> f64 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite() && *n >= 0.0).unwrap_or(0.0)
}

fn timestamp(raw: Option<&Value>) -> Timestamp {
    match raw {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}
