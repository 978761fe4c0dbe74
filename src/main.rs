use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use power_backend::{
    config::Config,
    database::{create_shard_pools, init_schema},
    handlers,
    middlewares::create_cors,
    services::OrderService,
    store::ShardedStore,
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置，非法的分片拓扑在这里直接拒绝启动
    let config = Config::from_toml().expect("Failed to load configuration file");
    config
        .sharding
        .validate()
        .expect("Invalid sharding configuration");

    // 每个物理库一个连接池，并建出全部物理表
    let pools = create_shard_pools(&config.sharding)
        .await
        .expect("Failed to create shard connection pools");
    init_schema(&pools, config.sharding.table_count)
        .await
        .expect("Failed to initialize shard schema");

    // 分片存储与服务；变更分片数量需要以新配置重建这两者
    let store = ShardedStore::new(pools, config.sharding.table_count)
        .expect("Failed to build sharded store");
    let order_service = OrderService::new(store.clone());

    log::info!(
        "分片拓扑: {} 库 x {} 表",
        store.resolver().db_count(),
        store.resolver().table_count()
    );
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let bind_addr = (config.server.host.clone(), config.server.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .configure(swagger_config)
            .configure(handlers::debug_config)
            .service(web::scope("/api").configure(handlers::order_config))
    })
    .bind((bind_addr.0.as_str(), bind_addr.1))?
    .run()
    .await
}
