#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pcb_risk_lib::run().await
}
