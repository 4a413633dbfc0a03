use axum::http::Method;
use tower::{
    ServiceBuilder,
    layer::util::{Identity, Stack},
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>>;

// the raffle UI is served from another origin and only ever reads photos
pub(crate) fn build_service_layers()
-> ServiceBuilder<Stack<CorsLayer, Stack<HttpTraceLayer, Identity>>> {
    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
}
