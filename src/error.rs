use std::io;

use thiserror::Error;

use crate::node::NodeId;

/// Failure modes of a tree build. Nothing is retried; any failure aborts the
/// whole build so a partial tree is never presented as valid.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("i/o failure on {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("could not spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("hash for node {0} was already written")]
    DuplicateWrite(NodeId),

    #[error("node {parent} became ready before child {child} finished")]
    UnreadyChild { parent: NodeId, child: NodeId },

    /// The aggregate the orchestrator surfaces: the first failure seen during
    /// a build, tagged with the node it happened at.
    #[error("tree build aborted at node {node}: {source}")]
    Build {
        node: NodeId,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn at_node(self, node: NodeId) -> Self {
        Error::Build {
            node,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
