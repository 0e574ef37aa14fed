//! Synthetic OBJECTS.DATA fragments for integration tests.
//!
//! Every chunk pushed here ends with exactly one `\n`, so chunk indices in the
//! tests map one-to-one onto the scanner's chunks.

#![allow(dead_code)]

pub const UPDATER_ARGS: &str = r#"powershell.exe -NoP -W Hidden -c "iex(New-Object Net.WebClient)""#;
pub const NIGHTLY_QUERY: &str = r#"SELECT * FROM __InstanceCreationEvent WITHIN 5 WHERE TargetInstance ISA "Win32_Process" AND TargetInstance.Name = "notepad.exe""#;

/// Builder for newline-chunked repository bytes.
#[derive(Default)]
pub struct Fixture {
    chunks: Vec<Vec<u8>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk; `bytes` must not contain `\n`.
    pub fn chunk(mut self, bytes: &[u8]) -> Self {
        assert!(!bytes.contains(&b'\n'), "chunk must not contain a newline");
        let mut chunk = bytes.to_vec();
        chunk.push(b'\n');
        self.chunks.push(chunk);
        self
    }

    /// Append `count` chunks of filler that match no pattern.
    pub fn noise(mut self, count: usize) -> Self {
        for i in 0..count {
            self = self.chunk(format!("\x00\x13page {i} free space\x00\x00\x01").as_bytes());
        }
        self
    }

    /// Binding instance split over three chunks.
    pub fn binding(self, consumer: &str, filter: &str) -> Self {
        self.chunk(b"\x00\x00__FilterToConsumerBinding\x00\x00")
            .chunk(format!("CommandLineEventConsumer.Name=\"{consumer}\"\x00").as_bytes())
            .chunk(format!("\x00__EventFilter.Name=\"{filter}\"\x00\x00").as_bytes())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn build(self) -> Vec<u8> {
        self.chunks.concat()
    }
}

/// Twenty chunks: one binding, one command line consumer split across two
/// chunks, one filter split across two chunks, noise in between.
pub fn twenty_chunk_repository() -> Vec<u8> {
    let fixture = Fixture::new()
        .noise(2)
        .binding("Updater", "Nightly")
        .noise(3)
        .chunk(b"\x00CommandLineEventConsumer\x00\x00powershell.exe -NoP -W Hidden -c \"iex(")
        .chunk(b"New-Object Net.WebClient)\"\x00\x00\x7fUpdater\x00\x00C:\\Windows\\Temp\x00")
        .noise(3)
        .chunk(b"\x02Nightly\x00\x00SELECT * FROM __InstanceCreationEvent WITHIN 5 WHERE TargetInstance ISA \"Win32_Process\"")
        .chunk(b" AND TargetInstance.Name = \"notepad.exe\"\x00\x00root\\cimv2")
        .noise(5);
    assert_eq!(fixture.len(), 20);
    fixture.build()
}
