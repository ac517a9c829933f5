//! Register shadows and the deduplicating write buffer

use crate::vgm::{Command, WriteRegister};

const UNSET: i16 = -1;

/// Last-written value of every register, one 256-entry bank per port
#[derive(Debug, Clone)]
pub struct RegisterShadow {
    banks: Vec<[i16; 256]>,
}

impl RegisterShadow {
    pub fn new(ports: usize) -> Self {
        Self {
            banks: vec![[UNSET; 256]; ports.max(1)],
        }
    }

    /// Stored value, or `None` if the register was never written
    pub fn get(&self, port: u8, addr: u8) -> Option<u8> {
        let value = self.banks.get(port as usize)?[addr as usize];
        if value == UNSET {
            None
        } else {
            Some(value as u8)
        }
    }

    /// Stored value, reading unwritten registers as zero
    pub fn value(&self, port: u8, addr: u8) -> u8 {
        self.get(port, addr).unwrap_or(0)
    }

    pub fn set(&mut self, port: u8, addr: u8, data: u8) {
        if let Some(bank) = self.banks.get_mut(port as usize) {
            bank[addr as usize] = data as i16;
        }
    }

    pub fn ports(&self) -> usize {
        self.banks.len()
    }
}

/// Stages outgoing commands for one source event, dropping redundant writes.
///
/// Optimized pushes compare against the shadow of committed values; a
/// second optimized push to an address that is already staged rewrites the
/// staged entry in place.
#[derive(Debug, Clone)]
pub struct WriteBuffer {
    shadow: RegisterShadow,
    staged: Vec<Command>,
}

impl WriteBuffer {
    pub fn new(ports: usize) -> Self {
        Self {
            shadow: RegisterShadow::new(ports),
            staged: Vec::new(),
        }
    }

    /// Stage a register write
    pub fn push(&mut self, write: WriteRegister, optimize: bool) {
        if write.port as usize >= self.shadow.ports() {
            log::debug!("dropping write to undeclared port {}", write.port);
            return;
        }
        if !optimize {
            self.staged.push(Command::Write(write));
            return;
        }

        let committed = self.shadow.get(write.port, write.addr);
        let pending = self.staged.iter().position(|c| match c {
            Command::Write(w) => w.port == write.port && w.addr == write.addr,
            _ => false,
        });

        match pending {
            Some(i) if committed == Some(write.data) => {
                self.staged.remove(i);
            }
            Some(i) => self.staged[i] = Command::Write(write),
            None if committed == Some(write.data) => {}
            None => self.staged.push(Command::Write(write)),
        }
    }

    /// Stage a non-write command; never deduplicated
    pub fn push_command(&mut self, cmd: Command) {
        match cmd {
            Command::Write(w) => self.push(w, false),
            other => self.staged.push(other),
        }
    }

    /// Flush staged commands in order and record their values in the shadow
    pub fn commit(&mut self) -> Vec<Command> {
        for cmd in &self.staged {
            if let Command::Write(w) = cmd {
                self.shadow.set(w.port, w.addr, w.data);
            }
        }
        std::mem::take(&mut self.staged)
    }

    /// Committed value of a destination register
    pub fn committed(&self, port: u8, addr: u8) -> Option<u8> {
        self.shadow.get(port, addr)
    }
}
