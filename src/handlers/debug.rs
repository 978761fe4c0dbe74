use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::config::Config;
use crate::store::ShardedStore;

#[utoipa::path(
    get,
    path = "/debug/config",
    tag = "debug",
    responses(
        (status = 200, description = "当前分片拓扑")
    )
)]
pub async fn show_sharding_config(
    config: web::Data<Config>,
    store: web::Data<ShardedStore>,
) -> Result<HttpResponse> {
    let resolver = store.resolver();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "database_count": resolver.db_count(),
        "table_count": resolver.table_count(),
        "database_urls": config.sharding.database_urls,
        "database_strategy": "user_id % database_count",
        "table_strategy": "order_id % table_count"
    })))
}

#[utoipa::path(
    get,
    path = "/debug/shards",
    tag = "debug",
    responses(
        (status = 200, description = "各物理分片行数"),
        (status = 503, description = "分片不可用")
    )
)]
pub async fn show_shard_layout(store: web::Data<ShardedStore>) -> Result<HttpResponse> {
    match store.shard_layout().await {
        Ok(layout) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "shards": layout
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn debug_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/debug")
            .route("/config", web::get().to(show_sharding_config))
            .route("/shards", web::get().to(show_shard_layout)),
    );
}
