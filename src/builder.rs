//! Thin fluent sugar over the raw [`Context`] control API.
//!
//! `create_node`/`connect_ports` already form a complete API; this module
//! only saves callers from juggling raw `(node, port)` index pairs when
//! wiring up a small graph by hand.

use crate::context::Context;
use crate::error::RivuletResult;
use crate::port::PortHandle;

/// A lightweight handle to a node created through [`Context::create_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub usize);

impl NodeHandle {
    /// Returns a handle to one of this node's ports by index.
    #[inline]
    pub fn port(&self, port_index: usize) -> PortRef {
        PortRef {
            node: self.0,
            port: port_index,
        }
    }
}

/// A lightweight handle to one port on a node created through the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRef {
    pub node: usize,
    pub port: usize,
}

impl PortRef {
    /// Connects this port to `dest` on `ctx`, forwarding to
    /// [`Context::connect_ports`].
    #[inline]
    pub fn connect(&self, ctx: &mut Context, dest: PortRef) -> RivuletResult<()> {
        ctx.connect_ports(
            PortHandle {
                node: self.node,
                port: self.port,
            },
            PortHandle {
                node: dest.node,
                port: dest.port,
            },
        )
    }
}
