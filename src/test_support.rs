use axum::Router;

/// Levanta `router` en un puerto libre de localhost y devuelve su URL base.
pub async fn servidor_falso(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
