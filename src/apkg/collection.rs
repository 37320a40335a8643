use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::{params, Connection};
use serde_json::{json, Map, Value};

use super::ids::{field_checksum, guid_for, strip_html};
use crate::bind::BoundCard;
use crate::model::CardModel;

const SCHEMA: &str = r#"
CREATE TABLE col (
    id              integer primary key,
    crt             integer not null,
    mod             integer not null,
    scm             integer not null,
    ver             integer not null,
    dty             integer not null,
    usn             integer not null,
    ls              integer not null,
    conf            text not null,
    models          text not null,
    decks           text not null,
    dconf           text not null,
    tags            text not null
);
CREATE TABLE notes (
    id              integer primary key,
    guid            text not null,
    mid             integer not null,
    mod             integer not null,
    usn             integer not null,
    tags            text not null,
    flds            text not null,
    sfld            integer not null,
    csum            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE cards (
    id              integer primary key,
    nid             integer not null,
    did             integer not null,
    ord             integer not null,
    mod             integer not null,
    usn             integer not null,
    type            integer not null,
    queue           integer not null,
    due             integer not null,
    ivl             integer not null,
    factor          integer not null,
    reps            integer not null,
    lapses          integer not null,
    left            integer not null,
    odue            integer not null,
    odid            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE revlog (
    id              integer primary key,
    cid             integer not null,
    usn             integer not null,
    ease            integer not null,
    ivl             integer not null,
    lastIvl         integer not null,
    factor          integer not null,
    time            integer not null,
    type            integer not null
);
CREATE TABLE graves (
    usn             integer not null,
    oid             integer not null,
    type            integer not null
);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
"#;

const SCHEMA_VERSION: i64 = 11;
const FIELD_SEPARATOR: &str = "\x1f";
const DEFAULT_DECK_ID: i64 = 1;

const LATEX_PRE: &str = "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n";
const LATEX_POST: &str = "\\end{document}";

/// Identity of the deck the collection's cards land in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckMeta<'a> {
    pub id: i64,
    pub name: &'a str,
}

fn referenced_fields(template: &str) -> Vec<&str> {
    // Plain `{{Field}}` substitutions only; sections don't make a card non-empty.
    let re = Regex::new(r"\{\{([^#^/{}!][^{}]*)\}\}").expect("static pattern");
    re.captures_iter(template)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect()
}

/// Which fields must be non-empty for each template to produce a card.
fn requirements(model: &CardModel) -> Value {
    let req: Vec<Value> = model
        .templates
        .iter()
        .enumerate()
        .map(|(ord, template)| {
            let referenced = referenced_fields(&template.front);
            let fields: Vec<usize> = model
                .fields
                .iter()
                .enumerate()
                .filter(|(_, f)| referenced.contains(&f.name.as_str()))
                .map(|(i, _)| i)
                .collect();
            json!([ord, "any", fields])
        })
        .collect();
    Value::Array(req)
}

fn model_json(model: &CardModel, deck_id: i64, modified: i64) -> Value {
    let fields: Vec<Value> = model
        .fields
        .iter()
        .enumerate()
        .map(|(ord, field)| {
            json!({
                "name": field.name,
                "ord": ord,
                "font": "Liberation Sans",
                "media": [],
                "rtl": false,
                "size": 20,
                "sticky": false,
            })
        })
        .collect();
    let templates: Vec<Value> = model
        .templates
        .iter()
        .enumerate()
        .map(|(ord, template)| {
            json!({
                "name": template.name,
                "ord": ord,
                "qfmt": template.front,
                "afmt": template.back,
                "bqfmt": "",
                "bafmt": "",
                "did": null,
            })
        })
        .collect();

    json!({
        "id": model.id.to_string(),
        "name": model.name,
        "type": 0,
        "css": model.css,
        "did": deck_id,
        "flds": fields,
        "tmpls": templates,
        "sortf": model.sort_field,
        "req": requirements(model),
        "latexPre": LATEX_PRE,
        "latexPost": LATEX_POST,
        "latexsvg": false,
        "mod": modified,
        "usn": -1,
        "tags": [],
        "vers": [],
    })
}

fn deck_json(id: i64, name: &str, modified: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "conf": 1,
        "dyn": 0,
        "collapsed": false,
        "extendNew": 0,
        "extendRev": 50,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
        "mod": modified,
        "usn": -1,
    })
}

fn collection_conf() -> Value {
    json!({
        "activeDecks": [DEFAULT_DECK_ID],
        "curDeck": DEFAULT_DECK_ID,
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "curModel": null,
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true,
    })
}

fn deck_conf(modified: i64) -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "replayq": true,
            "autoplay": true,
            "timer": 0,
            "maxTaken": 60,
            "mod": modified,
            "usn": 0,
            "new": {
                "perDay": 20,
                "delays": [1, 10],
                "ints": [1, 4, 7],
                "initialFactor": 2500,
                "separate": true,
                "order": 1,
                "bury": true,
            },
            "rev": {
                "perDay": 100,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "bury": true,
            },
            "lapse": {
                "delays": [10],
                "mult": 0,
                "minInt": 1,
                "leechFails": 8,
                "leechAction": 0,
            },
        }
    })
}

/// Writes an Anki collection holding `cards` as notes of `model` in `deck`.
///
/// Note and card ids count up from `timestamp` in milliseconds; each card's
/// `due` is its note's 1-based position, which fixes first-import order.
pub fn write_collection(
    path: &Path,
    deck: &DeckMeta<'_>,
    model: &CardModel,
    cards: &[BoundCard],
    timestamp: i64,
) -> Result<()> {
    let id_span = (cards.len() * model.templates.len().max(1)) as i64;
    let base_id = timestamp
        .checked_mul(1000)
        .filter(|ms| ms.checked_add(id_span).is_some())
        .with_context(|| format!("Timestamp {} is too large for collection ids", timestamp))?;

    let mut conn = Connection::open(path)
        .with_context(|| format!("Failed to create collection at {:?}", path))?;
    conn.execute_batch(SCHEMA)
        .context("Failed to create collection schema")?;

    let mut models = Map::new();
    models.insert(model.id.to_string(), model_json(model, deck.id, timestamp));
    let mut decks = Map::new();
    decks.insert(
        DEFAULT_DECK_ID.to_string(),
        deck_json(DEFAULT_DECK_ID, "Default", timestamp),
    );
    decks.insert(deck.id.to_string(), deck_json(deck.id, deck.name, timestamp));

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO col VALUES (NULL, ?1, ?2, ?3, ?4, 0, 0, 0, ?5, ?6, ?7, ?8, '{}')",
        params![
            timestamp,
            base_id,
            base_id,
            SCHEMA_VERSION,
            collection_conf().to_string(),
            Value::Object(models).to_string(),
            Value::Object(decks).to_string(),
            deck_conf(timestamp).to_string(),
        ],
    )
    .context("Failed to write collection header")?;

    let mut card_id = base_id;
    for (position, card) in cards.iter().enumerate() {
        let note_id = base_id + position as i64;
        let values: Vec<&str> = card.fields.iter().map(String::as_str).collect();
        let first = values.first().copied().unwrap_or_default();
        let sort_value = values.get(model.sort_field).copied().unwrap_or_default();

        tx.execute(
            "INSERT INTO notes VALUES (?1, ?2, ?3, ?4, -1, '', ?5, ?6, ?7, 0, '')",
            params![
                note_id,
                guid_for(&values),
                model.id,
                timestamp,
                values.join(FIELD_SEPARATOR),
                strip_html(sort_value),
                field_checksum(first),
            ],
        )
        .with_context(|| format!("Failed to write note {}", position + 1))?;

        for ord in 0..model.templates.len() {
            tx.execute(
                "INSERT INTO cards VALUES (?1, ?2, ?3, ?4, ?5, -1, 0, 0, ?6, 0, 0, 0, 0, 0, 0, 0, 0, '')",
                params![card_id, note_id, deck.id, ord as i64, timestamp, position as i64 + 1],
            )
            .with_context(|| format!("Failed to write card for note {}", position + 1))?;
            card_id += 1;
        }
    }
    tx.commit().context("Failed to commit collection")?;
    Ok(())
}
