use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{Id, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Field that groups spans belonging to one request.
pub const REQUEST_ID: &str = "request.id";

/// A closed span as captured by [`InMemoryTraceLayer`].
#[derive(Debug, Clone, Serialize)]
pub struct SpanData {
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,
    pub request_id: String,
    /// Nanoseconds since the Unix epoch.
    pub start_time: u128,
    pub end_time: u128,
    pub attributes: HashMap<String, serde_json::Value>,
}

impl SpanData {
    /// Span duration in nanoseconds.
    pub fn duration_nanos(&self) -> u128 {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// Captured spans, grouped by request id.
#[derive(Debug, Clone, Default)]
pub struct SharedTraceStorage {
    traces: Arc<RwLock<HashMap<String, Vec<SpanData>>>>,
}

impl SharedTraceStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spans recorded for `request_id`, in closing order.
    pub fn get_trace(&self, request_id: &str) -> Option<Vec<SpanData>> {
        self.traces.read().ok()?.get(request_id).cloned()
    }

    /// Append a closed span to the trace for `request_id`.
    pub fn add_span(&self, request_id: String, span: SpanData) {
        if let Ok(mut traces) = self.traces.write() {
            traces.entry(request_id).or_default().push(span);
        }
    }

    /// Every request id seen so far.
    pub fn request_ids(&self) -> Vec<String> {
        self.traces.read().map(|t| t.keys().cloned().collect()).unwrap_or_default()
    }

    /// Drop every captured span.
    pub fn clear(&self) {
        if let Ok(mut traces) = self.traces.write() {
            traces.clear();
        }
    }
}

/// A tracing layer that keeps closed spans in memory, keyed by `request.id`.
///
/// A span without its own `request.id` inherits the parent's, so stage spans
/// opened under an `assistant.respond` span land in the same trace. Spans
/// with no request id anywhere up the tree are not stored.
pub struct InMemoryTraceLayer {
    storage: Arc<SharedTraceStorage>,
}

impl InMemoryTraceLayer {
    /// Create a layer that writes closed spans into `storage`.
    pub fn new(storage: Arc<SharedTraceStorage>) -> Self {
        Self { storage }
    }
}

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

struct StartTime(u128);

fn now_nanos() -> u128 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos()
}

impl<S> Layer<S> for InMemoryTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        if !fields.contains_key(REQUEST_ID) {
            let inherited = span.parent().and_then(|parent| {
                let extensions = parent.extensions();
                extensions.get::<SpanFields>().and_then(|f| f.0.get(REQUEST_ID).cloned())
            });
            if let Some(request_id) = inherited {
                fields.insert(REQUEST_ID.to_string(), request_id);
            }
        }

        let mut extensions = span.extensions_mut();
        extensions.insert(StartTime(now_nanos()));
        extensions.insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let extensions = span.extensions();
        let attributes = extensions.get::<SpanFields>().map(|f| f.0.clone()).unwrap_or_default();
        let Some(request_id) = attributes.get(REQUEST_ID).and_then(|v| v.as_str()).map(str::to_string)
        else {
            return;
        };

        let span_data = SpanData {
            span_id: format!("{:016x}", id.into_u64()),
            parent_span_id: span.parent().map(|p| format!("{:016x}", p.id().into_u64())),
            name: span.metadata().name().to_string(),
            request_id: request_id.clone(),
            start_time: extensions.get::<StartTime>().map(|s| s.0).unwrap_or(0),
            end_time: now_nanos(),
            attributes,
        };
        self.storage.add_span(request_id, span_data);
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info_span;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(storage: &Arc<SharedTraceStorage>, f: impl FnOnce()) {
        let subscriber =
            tracing_subscriber::registry().with(InMemoryTraceLayer::new(storage.clone()));
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn child_spans_inherit_request_id() {
        let storage = Arc::new(SharedTraceStorage::new());
        capture(&storage, || {
            let root = info_span!("assistant.respond", request.id = "req-1");
            let _root = root.enter();
            let rank = info_span!("kb.rank", candidates = 3u64);
            let _rank = rank.enter();
        });

        let spans = storage.get_trace("req-1").unwrap();
        let names: Vec<&str> = spans.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["kb.rank", "assistant.respond"]);
        assert_eq!(spans[0].attributes["candidates"], serde_json::json!(3));
        assert_eq!(spans[0].parent_span_id.as_deref(), Some(spans[1].span_id.as_str()));
        assert!(spans[1].end_time >= spans[1].start_time);
    }

    #[test]
    fn spans_without_request_id_are_dropped() {
        let storage = Arc::new(SharedTraceStorage::new());
        capture(&storage, || {
            let _span = info_span!("kb.extract").entered();
        });
        assert!(storage.request_ids().is_empty());
    }

    #[test]
    fn recorded_fields_are_kept() {
        let storage = Arc::new(SharedTraceStorage::new());
        capture(&storage, || {
            let span =
                info_span!("assistant.respond", request.id = "req-2", outcome = tracing::field::Empty);
            span.record("outcome", "answered");
        });

        let spans = storage.get_trace("req-2").unwrap();
        assert_eq!(spans[0].attributes["outcome"], serde_json::json!("answered"));

        let json = serde_json::to_value(&spans[0]).unwrap();
        assert!(json.get("parent_span_id").is_none());
        storage.clear();
        assert!(storage.get_trace("req-2").is_none());
    }
}
