use futures::{
    stream,
    stream::{StreamExt, TryStreamExt},
};
use lockstep_core::{Config, PassThrough, TimeSynchronizer, TimedEvent, WithTimestamp, sync};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Define your message type
#[derive(Debug, Clone)]
struct MyMessage(&'static str, Duration);

impl WithTimestamp for MyMessage {
    fn timestamp(&self) -> Duration {
        self.1
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run_callbacks()?;
    run_stream().await?;

    Ok(())
}

/// Wire two upstream filters into a synchronizer and print each tuple.
fn run_callbacks() -> eyre::Result<()> {
    let camera = PassThrough::<MyMessage>::new();
    let lidar = PassThrough::<MyMessage>::new();
    let sync = TimeSynchronizer::<MyMessage>::with_sources(&[&camera, &lidar], 4)?;

    sync.register_callback(|group: &[TimedEvent<MyMessage>]| {
        println!(
            "matched {:?}: {} + {}",
            group[0].timestamp(),
            group[0].message().0,
            group[1].message().0
        );
    });
    sync.register_drop_callback(|slots: &[Option<TimedEvent<MyMessage>>]| {
        for (channel, slot) in slots.iter().enumerate() {
            if let Some(event) = slot {
                println!("dropped {:?} on channel {channel}", event.timestamp());
            }
        }
    });

    for ms in [100, 200, 300, 400, 500, 600] {
        camera.add(MyMessage("camera", Duration::from_millis(ms)));
    }
    for ms in [300, 450, 500, 600] {
        lidar.add(MyMessage("lidar", Duration::from_millis(ms)));
    }

    println!("{:?}", sync.stats());
    Ok(())
}

/// Synchronize an interleaved stream of channel-tagged messages.
async fn run_stream() -> eyre::Result<()> {
    let x_seq = &[1000, 2000, 3000];
    let y_seq = &[998, 2000, 3000];

    macro_rules! make_stream {
        ($name:expr, $seq:expr) => {{
            stream::iter(
                $seq.iter()
                    .map(|&ts| MyMessage($name, Duration::from_millis(ts))),
            )
        }};
    }

    // Join two streams into one, where each message is tagged with its
    // channel index.
    let join_stream = stream::select(
        make_stream!("x", x_seq).map(|msg| (0usize, msg)),
        make_stream!("y", y_seq).map(|msg| (1usize, msg)),
    )
    .map(eyre::Ok);

    let sync_stream = sync(join_stream, Config::new(2, 16))?;

    let groups: Vec<Vec<TimedEvent<MyMessage>>> = sync_stream.try_collect().await?;
    println!("{groups:#?}");

    Ok(())
}
