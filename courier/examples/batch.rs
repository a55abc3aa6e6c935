use courier::*;
use mortar::Outcome;

#[monoio::main]
async fn main() {
    println!("=== Batch Request Demo ===\n");

    let api = Api::new("https://shop.example.com/api");
    let mut client = Client::new();

    let requests = api
        .batch([
            (Method::Get, "products/1"),
            (Method::Get, "products/2"),
            (Method::Get, "products/3"),
        ])
        .unwrap();

    let batch = client.batch(requests).unwrap();
    batch
        .then(|_, results| {
            println!("✓ All {} lookups finished", results.len());
            None
        })
        .unwrap()
        .error(|_, _| {
            println!("✗ The last lookup to finish failed");
            None
        })
        .unwrap()
        .always(|_, results| {
            for exchange in results.values().into_iter().filter_map(Message::as_exchange) {
                let status = exchange.response.as_ref().map(|r| r.status).unwrap_or(0);
                println!("  #{} {} -> {}", exchange.index, exchange.request, status);
            }
            None
        })
        .unwrap();

    // Pretend the transport answers in reverse order.
    let outbox = client.take_outbox();
    for outbound in outbox.iter().rev() {
        println!("Delivering {} {}", outbound.request.method, outbound.request.url);
        client
            .deliver(outbound.id, Response::new(200, "{}"))
            .unwrap();
    }

    match batch.settled().await {
        Outcome::Success => println!("\nBatch succeeded"),
        Outcome::Failure => println!("\nBatch failed"),
    }
}
