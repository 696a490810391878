pub mod logging;
pub mod trace_context;

pub use logging::init_tracing;
pub use trace_context::{
    extract_request_id, inject_trace_context, TracedClientExt, TracedRequest, REQUEST_ID_HEADER,
    TRACEPARENT_HEADER, TRACESTATE_HEADER,
};
