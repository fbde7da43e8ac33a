use crate::{
    Config,
    event::TimedEvent,
    synchronizer::TimeSynchronizer,
    types::{Group, OutputStream, WithTimestamp},
};
use eyre::Result;
use futures::{
    StreamExt,
    stream::{self, Stream},
};
use std::task::{Context, Poll, Poll::*};

/// Consume a stream of messages, each tagged with its channel index,
/// and emit a group whenever every channel has produced a message with
/// the same timestamp.
///
/// Each group holds one event per channel, in channel order. Messages
/// evicted by the per-channel queue limit are discarded. An error from
/// the input, or a channel index out of range, is forwarded and ends the
/// output stream.
pub fn sync<'a, M, S>(stream: S, config: Config) -> Result<OutputStream<'a, M>>
where
    M: WithTimestamp + Send + Sync + 'static,
    S: Stream<Item = Result<(usize, M)>> + Unpin + Send + 'a,
{
    let synchronizer = TimeSynchronizer::from_config(config)?;

    // Matched groups are handed over from the callback to the poller.
    let (group_tx, group_rx) = flume::unbounded();
    synchronizer.register_callback(move |group: &[TimedEvent<M>]| {
        let _ = group_tx.send(group.to_vec());
    });

    let output_stream = {
        let mut stream = Some(stream);
        stream::poll_fn(move |ctx| poll(&mut stream, &synchronizer, &group_rx, ctx))
    };

    Ok(output_stream.boxed())
}

/// The polling function is repeatedly called to feed the synchronizer
/// until a group is available.
fn poll<M, S>(
    input_stream: &mut Option<S>,
    synchronizer: &TimeSynchronizer<M>,
    groups: &flume::Receiver<Group<M>>,
    ctx: &mut Context<'_>,
) -> Poll<Option<Result<Group<M>>>>
where
    M: WithTimestamp + Send + Sync + 'static,
    S: Stream<Item = Result<(usize, M)>> + Unpin + Send,
{
    loop {
        // Emit groups formed by earlier inputs first.
        if let Ok(group) = groups.try_recv() {
            return Ready(Some(Ok(group)));
        }

        let Some(input) = input_stream.as_mut() else {
            // The input is depleted and every group has been emitted.
            return Ready(None);
        };

        match input.poll_next_unpin(ctx) {
            Ready(Some(Ok((channel, message)))) => {
                if let Err(err) = synchronizer.add(channel, message) {
                    *input_stream = None;
                    return Ready(Some(Err(err)));
                }
            }
            Ready(Some(Err(err))) => {
                *input_stream = None;
                return Ready(Some(Err(err)));
            }
            Ready(None) => {
                *input_stream = None;
            }
            Pending => return Pending,
        }
    }
}
