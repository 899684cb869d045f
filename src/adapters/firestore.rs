use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::config::GoogleConfig;
use crate::error::StoreError;
use crate::ports::DocumentStore;
use crate::types::{Event, NotificationWrite, ReminderKind, Snapshot, User};

const EVENTS: &str = "News";
const USERS: &str = "users";
const REMINDERS: &str = "reminders";
const PAGE_SIZE: usize = 300;
const AUTO_ID_LEN: usize = 20;

/// Cloud Firestore over the REST v1 API.
#[derive(Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    /// `https://…/v1/projects/{p}/databases/(default)/documents`
    base_url: String,
    /// `projects/{p}/databases/(default)/documents`
    root: String,
    access_token: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(Json),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct MapValue {
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<Document>,
}

impl Document {
    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    fn decode<T: DeserializeOwned>(self) -> Result<Snapshot<T>, StoreError> {
        let id = self.id().to_string();
        let json = fields_to_json(self.fields);
        let data = serde_json::from_value(json).map_err(|err| StoreError::decode(&self.name, err))?;
        Ok(Snapshot { id, data })
    }
}

/// Decodes every document that fits `T`. Documents that don't are logged and
/// skipped.
fn decode_all<T: DeserializeOwned>(
    collection: &str,
    documents: impl IntoIterator<Item = Document>,
) -> Vec<Snapshot<T>> {
    documents
        .into_iter()
        .filter_map(|document| match document.decode() {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(collection = %collection, error = %err, "skipping undecodable document");
                None
            }
        })
        .collect()
}

fn to_json(value: Value) -> Json {
    match value {
        Value::NullValue(()) => Json::Null,
        Value::BooleanValue(value) => Json::Bool(value),
        Value::IntegerValue(raw) => match raw.parse::<i64>() {
            Ok(value) => Json::from(value),
            Err(_) => Json::String(raw),
        },
        Value::DoubleValue(value) => serde_json::Number::from_f64(value)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::TimestampValue(raw)
        | Value::StringValue(raw)
        | Value::BytesValue(raw)
        | Value::ReferenceValue(raw) => Json::String(raw),
        Value::GeoPointValue(value) => value,
        Value::ArrayValue(array) => Json::Array(array.values.into_iter().map(to_json).collect()),
        Value::MapValue(map) => fields_to_json(map.fields),
    }
}

fn fields_to_json(fields: BTreeMap<String, Value>) -> Json {
    Json::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key, to_json(value)))
            .collect(),
    )
}

fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::NullValue(()),
        Json::Bool(value) => Value::BooleanValue(value),
        Json::Number(number) => match number.as_i64() {
            Some(value) => Value::IntegerValue(value.to_string()),
            None => Value::DoubleValue(number.as_f64().unwrap_or_default()),
        },
        Json::String(value) => Value::StringValue(value),
        Json::Array(values) => Value::ArrayValue(ArrayValue {
            values: values.into_iter().map(from_json).collect(),
        }),
        Json::Object(map) => Value::MapValue(MapValue {
            fields: map
                .into_iter()
                .map(|(key, value)| (key, from_json(value)))
                .collect(),
        }),
    }
}

fn fields_from<T: Serialize>(path: &str, value: &T) -> Result<BTreeMap<String, Value>, StoreError> {
    match serde_json::to_value(value).map_err(|err| StoreError::decode(path, err))? {
        Json::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, from_json(value)))
            .collect()),
        _ => Err(StoreError::decode(path, "document must encode as an object")),
    }
}

fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LEN)
        .map(char::from)
        .collect()
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

impl FirestoreStore {
    pub fn new(config: &GoogleConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        let root = format!(
            "projects/{}/databases/(default)/documents",
            config.project_id
        );
        Ok(Self {
            client,
            base_url: format!(
                "{}/v1/{root}",
                config.firestore_endpoint.trim_end_matches('/')
            ),
            root,
            access_token: Arc::from(config.access_token.as_str()),
        })
    }

    async fn check(path: &str, response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            path: path.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_document(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let response = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .bearer_auth(&*self.access_token)
            .send()
            .await
            .map_err(transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(path, response).await?;
        let document = response
            .json::<Document>()
            .await
            .map_err(|err| StoreError::decode(path, err))?;
        Ok(Some(document))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        match self.get_document(path).await? {
            Some(document) => Ok(Some(document.decode::<T>()?.data)),
            None => Ok(None),
        }
    }

    async fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<Snapshot<T>>, StoreError> {
        let mut snapshots = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(format!("{}/{collection}", self.base_url))
                .bearer_auth(&*self.access_token)
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }
            let response = request.send().await.map_err(transport)?;
            let response = Self::check(collection, response).await?;
            let page = response
                .json::<ListResponse>()
                .await
                .map_err(|err| StoreError::decode(collection, err))?;
            snapshots.extend(decode_all(collection, page.documents));
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(snapshots),
            }
        }
    }

    async fn query_array_contains<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Snapshot<T>>, StoreError> {
        let body = serde_json::json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "ARRAY_CONTAINS",
                        "value": { "stringValue": value }
                    }
                }
            }
        });
        let response = self
            .client
            .post(format!("{}:runQuery", self.base_url))
            .bearer_auth(&*self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::check(collection, response).await?;
        let items = response
            .json::<Vec<RunQueryItem>>()
            .await
            .map_err(|err| StoreError::decode(collection, err))?;
        Ok(decode_all(
            collection,
            items.into_iter().filter_map(|item| item.document),
        ))
    }

    async fn commit(&self, writes: Vec<Json>) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        let response = self
            .client
            .post(format!("{}:commit", self.base_url))
            .bearer_auth(&*self.access_token)
            .json(&serde_json::json!({ "writes": writes }))
            .send()
            .await
            .map_err(transport)?;
        Self::check("commit", response).await?;
        Ok(())
    }

    fn document_name(&self, path: &str) -> String {
        format!("{}/{path}", self.root)
    }
}

impl DocumentStore for FirestoreStore {
    type Fut<'a, T>
        = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>
    where
        Self: 'a,
        T: Send + 'a;

    fn event<'a>(&'a self, event_id: &'a str) -> Self::Fut<'a, Option<Event>> {
        Box::pin(async move { self.get(&format!("{EVENTS}/{event_id}")).await })
    }

    fn events(&self) -> Self::Fut<'_, Vec<Snapshot<Event>>> {
        Box::pin(async move { self.list(EVENTS).await })
    }

    fn user<'a>(&'a self, user_id: &'a str) -> Self::Fut<'a, Option<User>> {
        Box::pin(async move { self.get(&format!("{USERS}/{user_id}")).await })
    }

    fn users_booked_for<'a>(&'a self, event_id: &'a str) -> Self::Fut<'a, Vec<Snapshot<User>>> {
        Box::pin(async move {
            self.query_array_contains(USERS, "bookedEvents", event_id)
                .await
        })
    }

    fn reminder_sent<'a>(&'a self, event_id: &'a str, kind: ReminderKind) -> Self::Fut<'a, bool> {
        Box::pin(async move {
            let path = format!("{REMINDERS}/{}", kind.marker_id(event_id));
            Ok(self.get_document(&path).await?.is_some())
        })
    }

    fn mark_reminder<'a>(&'a self, event_id: &'a str, kind: ReminderKind) -> Self::Fut<'a, ()> {
        Box::pin(async move {
            let path = format!("{REMINDERS}/{}", kind.marker_id(event_id));
            let write = serde_json::json!({
                "update": {
                    "name": self.document_name(&path),
                    "fields": { "sent": Value::BooleanValue(true) }
                }
            });
            self.commit(vec![write]).await
        })
    }

    fn commit_notifications(&self, writes: Vec<NotificationWrite>) -> Self::Fut<'_, ()> {
        Box::pin(async move {
            let mut encoded = Vec::with_capacity(writes.len());
            for write in &writes {
                let path = format!("{}/{}", write.target.collection_path(), auto_id());
                let fields = fields_from(&path, &write.record)?;
                encoded.push(serde_json::json!({
                    "update": {
                        "name": self.document_name(&path),
                        "fields": fields
                    },
                    "updateTransforms": [{
                        "fieldPath": "timestamp",
                        "setToServerValue": "REQUEST_TIME"
                    }]
                }));
            }
            self.commit(encoded).await
        })
    }
}
