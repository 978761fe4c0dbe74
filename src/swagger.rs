use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::order::create_order,
        handlers::order::batch_create_test_orders,
        handlers::order::get_system_stats,
        handlers::order::health_check,
        handlers::order::get_order,
        handlers::order::get_order_by_no,
        handlers::order::get_user_orders,
        handlers::order::get_user_orders_page,
        handlers::order::get_user_total_amount,
        handlers::order::delete_user_orders,
        handlers::order::pay_order,
        handlers::order::complete_order,
        handlers::order::cancel_order,
        handlers::debug::show_sharding_config,
        handlers::debug::show_shard_layout,
    ),
    components(
        schemas(
            Order,
            OrderStatus,
            CreateOrderRequest,
            PageQuery,
            OrderList,
            SystemStats,
            ShardRowCount,
            ApiError,
            PaginatedOrderResponse,
        )
    ),
    tags(
        (name = "order", description = "Sharded order API"),
        (name = "debug", description = "Sharding debug API"),
    ),
    info(
        title = "Power Order Backend API",
        version = "1.0.0",
        description = "Sharded order routing demo REST API documentation"
    ),
    servers(
        (url = "/api", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
