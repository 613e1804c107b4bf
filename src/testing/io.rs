// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{self, ErrorKind, Read, Write},
    rc::Rc,
};

/// Bytes written by one end and not yet read by the other.
pub type Wire = Rc<RefCell<VecDeque<u8>>>;

/// Two in-memory byte queues, one per direction, joining a client and a
/// server connection in the same thread.
#[derive(Debug, Default)]
pub struct MemoryLink {
    pub to_client: Wire,
    pub to_server: Wire,
}

impl MemoryLink {
    pub fn client_end(&self) -> LinkEnd {
        LinkEnd {
            incoming: Rc::clone(&self.to_client),
            outgoing: Rc::clone(&self.to_server),
        }
    }

    pub fn server_end(&self) -> LinkEnd {
        LinkEnd {
            incoming: Rc::clone(&self.to_server),
            outgoing: Rc::clone(&self.to_client),
        }
    }

    /// Bytes in flight towards the client and towards the server.
    pub fn pending(&self) -> (usize, usize) {
        (self.to_client.borrow().len(), self.to_server.borrow().len())
    }
}

/// One end of a [`MemoryLink`], used as the transport of an `SslStream`.
#[derive(Debug)]
pub struct LinkEnd {
    incoming: Wire,
    outgoing: Wire,
}

impl Read for LinkEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.incoming.borrow_mut().read(buf)? {
            // an empty queue means the peer hasn't spoken yet, not a closed link
            0 if !buf.is_empty() => Err(ErrorKind::WouldBlock.into()),
            n => Ok(n),
        }
    }
}

impl Write for LinkEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outgoing.borrow_mut().extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
