//! Push interface for streaming links as they are produced

use crate::graph::Link;
use crate::{Error, Result};
use tokio::sync::mpsc::UnboundedSender;

/// Receives links one at a time during an enumeration.
pub trait LinkSink<I, V = f64> {
    fn write(&mut self, link: Link<I, V>) -> Result<()>;

    /// Called once after the last link of a successful enumeration.
    fn end(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<I, V> LinkSink<I, V> for Vec<Link<I, V>> {
    fn write(&mut self, link: Link<I, V>) -> Result<()> {
        self.push(link);
        Ok(())
    }
}

impl<I, V> LinkSink<I, V> for UnboundedSender<Link<I, V>> {
    fn write(&mut self, link: Link<I, V>) -> Result<()> {
        self.send(link)
            .map_err(|_| Error::Aborted("link receiver dropped".to_string()))
    }
}

impl<I, V, S: LinkSink<I, V> + ?Sized> LinkSink<I, V> for &mut S {
    fn write(&mut self, link: Link<I, V>) -> Result<()> {
        (**self).write(link)
    }

    fn end(&mut self) -> Result<()> {
        (**self).end()
    }
}
