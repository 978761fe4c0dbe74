use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::error::AppError;
use crate::models::*;
use crate::services::OrderService;

#[utoipa::path(
    post,
    path = "/orders",
    tag = "order",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "订单创建成功"),
        (status = 400, description = "参数校验失败")
    )
)]
pub async fn create_order(
    order_service: web::Data<OrderService>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    match order_service
        .create_order(body.user_id, &body.product_name, body.amount)
        .await
    {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            order,
            "订单创建成功".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/orders/batch-test",
    tag = "order",
    responses(
        (status = 200, description = "批量创建测试订单成功")
    )
)]
pub async fn batch_create_test_orders(
    order_service: web::Data<OrderService>,
) -> Result<HttpResponse> {
    match order_service.batch_create_test_orders().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "批量创建测试订单成功",
            "stats": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/stats",
    tag = "order",
    responses(
        (status = 200, description = "获取系统统计成功")
    )
)]
pub async fn get_system_stats(order_service: web::Data<OrderService>) -> Result<HttpResponse> {
    match order_service.system_stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(stats))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/health",
    tag = "order",
    responses(
        (status = 200, description = "服务存活")
    )
)]
pub async fn health_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "UP",
        "service": "order-service",
        "timestamp": chrono::Utc::now().timestamp_millis()
    })))
}

#[utoipa::path(
    get,
    path = "/orders/no/{order_no}",
    tag = "order",
    params(
        ("order_no" = String, Path, description = "订单号")
    ),
    responses(
        (status = 200, description = "查询成功"),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order_by_no(
    order_service: web::Data<OrderService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let order_no = path.into_inner();
    match order_service.get_order_by_no(&order_no).await {
        Ok(Some(order)) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Ok(None) => Ok(AppError::NotFound(format!("订单不存在: {order_no}")).error_response()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/user/{user_id}",
    tag = "order",
    params(
        ("user_id" = i64, Path, description = "用户ID")
    ),
    responses(
        (status = 200, description = "查询成功（分片部分失败时 partial=true）")
    )
)]
pub async fn get_user_orders(
    order_service: web::Data<OrderService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    // 总额聚合失败时 total_amount 为 null，列表的部分结果照常返回
    match order_service.get_user_orders_overview(user_id).await {
        Ok((list, total_amount)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "user_id": user_id,
            "total_amount": total_amount,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/user/{user_id}/page",
    tag = "order",
    params(
        ("user_id" = i64, Path, description = "用户ID"),
        ("page" = Option<i64>, Query, description = "页码，从0开始"),
        ("size" = Option<i64>, Query, description = "每页数量，1-100")
    ),
    responses(
        (status = 200, description = "分页查询成功")
    )
)]
pub async fn get_user_orders_page(
    order_service: web::Data<OrderService>,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    match order_service
        .get_user_orders_page(path.into_inner(), query.page, query.size)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/user/{user_id}/total-amount",
    tag = "order",
    params(
        ("user_id" = i64, Path, description = "用户ID")
    ),
    responses(
        (status = 200, description = "统计成功"),
        (status = 503, description = "分片不可用")
    )
)]
pub async fn get_user_total_amount(
    order_service: web::Data<OrderService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match order_service.get_user_total_amount(user_id).await {
        Ok(total_amount) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "user_id": user_id,
            "total_amount": total_amount
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/orders/user/{user_id}",
    tag = "order",
    params(
        ("user_id" = i64, Path, description = "用户ID")
    ),
    responses(
        (status = 200, description = "删除成功")
    )
)]
pub async fn delete_user_orders(
    order_service: web::Data<OrderService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match order_service.delete_user_orders(user_id).await {
        Ok(deleted_count) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "user_id": user_id,
            "deleted_count": deleted_count,
            "message": format!("成功删除用户 {user_id} 的 {deleted_count} 条订单")
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/{order_id}",
    tag = "order",
    params(
        ("order_id" = i64, Path, description = "订单ID")
    ),
    responses(
        (status = 200, description = "查询成功"),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order(
    order_service: web::Data<OrderService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let order_id = path.into_inner();
    match order_service.get_order_by_id(order_id).await {
        Ok(Some(order)) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Ok(None) => Ok(AppError::NotFound(format!("订单不存在: {order_id}")).error_response()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/orders/{order_id}/pay",
    tag = "order",
    params(
        ("order_id" = i64, Path, description = "订单ID")
    ),
    responses(
        (status = 200, description = "支付成功"),
        (status = 404, description = "订单不存在"),
        (status = 409, description = "状态不允许支付")
    )
)]
pub async fn pay_order(
    order_service: web::Data<OrderService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match order_service.pay_order(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            (),
            "订单支付成功".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/orders/{order_id}/complete",
    tag = "order",
    params(
        ("order_id" = i64, Path, description = "订单ID")
    ),
    responses(
        (status = 200, description = "完成成功"),
        (status = 404, description = "订单不存在"),
        (status = 409, description = "状态不允许完成")
    )
)]
pub async fn complete_order(
    order_service: web::Data<OrderService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match order_service.complete_order(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            (),
            "订单完成成功".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/orders/{order_id}/cancel",
    tag = "order",
    params(
        ("order_id" = i64, Path, description = "订单ID")
    ),
    responses(
        (status = 200, description = "取消成功"),
        (status = 404, description = "订单不存在"),
        (status = 409, description = "状态不允许取消")
    )
)]
pub async fn cancel_order(
    order_service: web::Data<OrderService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match order_service.cancel_order(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            (),
            "订单取消成功".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    // 字面路径要注册在 {order_id} 之前
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(create_order))
            .route("/batch-test", web::post().to(batch_create_test_orders))
            .route("/stats", web::get().to(get_system_stats))
            .route("/health", web::get().to(health_check))
            .route("/no/{order_no}", web::get().to(get_order_by_no))
            .route("/user/{user_id}", web::get().to(get_user_orders))
            .route("/user/{user_id}", web::delete().to(delete_user_orders))
            .route("/user/{user_id}/page", web::get().to(get_user_orders_page))
            .route(
                "/user/{user_id}/total-amount",
                web::get().to(get_user_total_amount),
            )
            .route("/{order_id}", web::get().to(get_order))
            .route("/{order_id}/pay", web::put().to(pay_order))
            .route("/{order_id}/complete", web::put().to(complete_order))
            .route("/{order_id}/cancel", web::put().to(cancel_order)),
    );
}
