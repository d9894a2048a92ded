use crate::api::routes;
use crate::config::Shared;
use crate::service::SharedService;
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: Shared,
    pub service: SharedService,
}

pub fn new(config: Shared, service: SharedService) -> impl Future<Output = hyper::Result<()>> {
    let bind_addr = config.api_bind_addr;
    axum::Server::bind(&bind_addr).serve(
        routes::new(AppState { config, service })
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
}
