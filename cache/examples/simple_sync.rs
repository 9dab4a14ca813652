use lru_ttl_cache::{Cache, EvictionReason};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  // A budget of 3 cost units, swept every 500ms.
  let cache: Cache<String, u32> = Cache::builder()
    .janitor_interval(Duration::from_millis(500))
    .max_cost(3)
    .eviction_listener(|key: String, value: Arc<u32>, reason: EvictionReason| {
      println!("evicted {} = {} ({})", key, value, reason);
    })
    .build()
    .expect("Failed to build cache");

  cache.set("a".to_string(), 1, Duration::ZERO, 1);
  cache.set("b".to_string(), 2, Duration::ZERO, 1);
  cache.set("c".to_string(), 3, Duration::from_secs(1), 1);

  // Touch "a" so "b" becomes the least recently used entry.
  println!("a = {:?}", cache.get("a"));

  // Pushes the total to 4, so "b" makes room.
  cache.set("d".to_string(), 4, Duration::ZERO, 1);
  println!("resident: {} entries, cost {}", cache.len(), cache.current_cost());

  println!("\nWaiting for \"c\" to expire...");
  thread::sleep(Duration::from_millis(1600));
  println!("c = {:?}", cache.get("c"));

  println!("\nCache metrics: {:#?}", cache.metrics());
  cache.close();
}
