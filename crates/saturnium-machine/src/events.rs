/// Which physical path produced an observed 4-byte write. The CPU store path
/// and the SCU-DMA engine are separate call sites in the emulator; both
/// forward into the same watchpoint callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSource {
    Cpu,
    Dma,
}

/// Which of the two SH-2 processors raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuId {
    Master,
    Slave,
}

impl CpuId {
    /// Tag used for subroutine-call events in trace files.
    pub fn call_tag(self) -> char {
        match self {
            CpuId::Master => 'M',
            CpuId::Slave => 'S',
        }
    }

    /// Lowercase tag used for instruction events, distinguishing them from
    /// call events in the unified stream.
    pub fn insn_tag(self) -> char {
        match self {
            CpuId::Master => 'm',
            CpuId::Slave => 's',
        }
    }
}

/// CD-block event class, tagged in trace files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdbClass {
    Cmd,
    Drv,
    Irq,
    Buf,
}

impl CdbClass {
    pub fn tag(self) -> &'static str {
        match self {
            CdbClass::Cmd => "CMD",
            CdbClass::Drv => "DRV",
            CdbClass::Irq => "IRQ",
            CdbClass::Buf => "BUF",
        }
    }
}

/// One CD-block event. The payload text is formatted by the CD block itself;
/// the control plane records it verbatim.
#[derive(Debug, Clone, Copy)]
pub enum CdEvent<'a> {
    /// Subcode-Q delivery.
    Scdq { payload: &'a str },
    /// Command/drive/interrupt/buffer activity.
    Cdb { class: CdbClass, payload: &'a str },
}
