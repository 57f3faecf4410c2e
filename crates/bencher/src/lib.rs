//! Inputs for the decoder benchmarks, generated instead of read from fixture files.

#[derive(Debug, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    input: Vec<u8>,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, input: Vec<u8>) -> Self {
        Self { name, group, input }
    }

    pub fn small(name: &'static str, input: Vec<u8>) -> Self {
        Self::new(name, TestGroup::Small, input)
    }

    pub fn normal(name: &'static str, input: Vec<u8>) -> Self {
        Self::new(name, TestGroup::Normal, input)
    }

    pub fn large(name: &'static str, input: Vec<u8>) -> Self {
        Self::new(name, TestGroup::Large, input)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

pub const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

/// A multipart/form-data body with `fields` text fields and one file of `file_len`
/// bytes. The file payload is full of `\r\n--` runs that almost match the delimiter.
pub fn multipart_body(fields: usize, file_len: usize) -> Vec<u8> {
    let mut body = Vec::with_capacity(file_len + fields * 128 + 256);

    for i in 0..fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(format!("Content-Disposition: form-data; name=\"field{i}\"\r\n\r\n").as_bytes());
        body.extend_from_slice(format!("value number {i}\r\n").as_bytes());
    }

    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"; filename=\"data.bin\"\r\n");
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    let pattern = b"0123456789abcdef\r\n----WebKit";
    body.extend(pattern.iter().copied().cycle().take(file_len));
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// `count` masked client frames carrying `payload_len` bytes of text each.
pub fn masked_frames(count: usize, payload_len: usize) -> Vec<u8> {
    const MASK: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

    let mut frames = Vec::with_capacity(count * (payload_len + 14));
    for _ in 0..count {
        frames.push(0x81);
        match payload_len {
            0..=125 => frames.push(0x80 | payload_len as u8),
            126..=0xFFFF => {
                frames.push(0x80 | 126);
                frames.extend_from_slice(&(payload_len as u16).to_be_bytes());
            }
            _ => {
                frames.push(0x80 | 127);
                frames.extend_from_slice(&(payload_len as u64).to_be_bytes());
            }
        }
        frames.extend_from_slice(&MASK);
        frames.extend((0..payload_len).map(|i| (b'a' + (i % 26) as u8) ^ MASK[i % 4]));
    }
    frames
}

/// An HTTP/1.1 GET request head with `headers` extra headers.
pub fn request_head(headers: usize) -> Vec<u8> {
    let mut head = String::from("GET /search?q=strand&page=2 HTTP/1.1\r\nHost: example.com\r\n");
    for i in 0..headers {
        head.push_str(&format!("X-Custom-Header-{i}: some header value number {i}\r\n"));
    }
    head.push_str("Cookie: theme=dark; _session=0123456789abcdefABCDEF0123456789\r\n");
    head.push_str("Accept-Language: en;q=0.8,fr;q=0.9,de\r\n\r\n");
    head.into_bytes()
}
