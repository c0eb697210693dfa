use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("event stream read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("event stream ended inside an event")]
    UnexpectedEof,

    #[error("malformed event: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// Button 2: run the text as a command.
    Execute,
    /// Button 3: open or search for the text.
    Look,
    Other,
}

/// A single window event as acme reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Where the event came from: `E` body/tag write, `F` file, `K` keyboard, `M` mouse.
    pub origin: char,
    /// What happened: `x`/`X` execute, `l`/`L` look, `i`/`I`/`d`/`D` edits.
    pub kind: char,
    pub q0: usize,
    pub q1: usize,
    pub flag: u32,
    pub text: String,
    /// Chorded argument, if any.
    pub arg: String,
}

impl Event {
    pub fn class(&self) -> EventClass {
        match self.kind {
            'x' | 'X' => EventClass::Execute,
            'l' | 'L' => EventClass::Look,
            _ => EventClass::Other,
        }
    }

    /// acme already knows what to do with this one (a built-in command or a
    /// file/window name).
    pub fn is_builtin(&self) -> bool {
        self.flag & 0x1 != 0
    }

    /// Wire form used when handing the event back to acme.
    pub fn to_write_back(&self) -> String {
        format!("{}{}{} {} \n", self.origin, self.kind, self.q0, self.q1)
    }
}

#[cfg(test)]
impl Event {
    pub fn execute(text: &str) -> Self {
        Self {
            origin: 'M',
            kind: 'x',
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn look(q0: usize, q1: usize, text: &str) -> Self {
        Self {
            origin: 'M',
            kind: 'l',
            q0,
            q1,
            text: text.to_string(),
            ..Default::default()
        }
    }
}

/// Decodes the `event` file of an acme window.
///
/// Each record is `c1 c2 q0 q1 flag nr text\n` where the numbers are followed
/// by a blank and `nr` counts runes. Flag bit 2 means a second record with the
/// expansion follows; flag bit 8 means two more records carry the chorded
/// argument and its location. The location is read and dropped.
pub struct EventDecoder<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> EventDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// The next complete event, or `None` once the stream ends cleanly.
    pub async fn next_event(&mut self) -> Result<Option<Event>, EventParseError> {
        let mut event = match self.read_record().await? {
            Some(event) => event,
            None => return Ok(None),
        };

        if event.flag & 0x2 != 0 {
            let expansion = self.expect_record().await?;
            // acme only expands a null selection.
            if event.q0 == event.q1 {
                event.q0 = expansion.q0;
                event.q1 = expansion.q1;
                event.text = expansion.text;
            }
        }

        if event.flag & 0x8 != 0 {
            let arg = self.expect_record().await?;
            self.expect_record().await?;
            event.arg = arg.text;
        }

        Ok(Some(event))
    }

    async fn expect_record(&mut self) -> Result<Event, EventParseError> {
        self.read_record()
            .await?
            .ok_or(EventParseError::UnexpectedEof)
    }

    async fn read_record(&mut self) -> Result<Option<Event>, EventParseError> {
        let origin = match self.read_char().await? {
            Some(c) => c,
            None => return Ok(None),
        };
        let kind = self.require_char().await?;
        let q0 = self.read_number().await?;
        let q1 = self.read_number().await?;
        let flag = self.read_number().await? as u32;
        let nr = self.read_number().await?;

        let mut text = String::with_capacity(nr);
        for _ in 0..nr {
            text.push(self.require_char().await?);
        }

        match self.require_char().await? {
            '\n' => {}
            c => {
                return Err(EventParseError::Malformed(format!(
                    "expected newline after text, got {:?}",
                    c
                )))
            }
        }

        Ok(Some(Event {
            origin,
            kind,
            q0,
            q1,
            flag,
            text,
            ..Default::default()
        }))
    }

    async fn read_number(&mut self) -> Result<usize, EventParseError> {
        let mut digits = String::new();
        loop {
            match self.require_char().await? {
                ' ' => break,
                c if c.is_ascii_digit() => digits.push(c),
                c => {
                    return Err(EventParseError::Malformed(format!(
                        "unexpected {:?} in number",
                        c
                    )))
                }
            }
        }
        digits
            .parse()
            .map_err(|_| EventParseError::Malformed(format!("bad number {:?}", digits)))
    }

    async fn require_char(&mut self) -> Result<char, EventParseError> {
        self.read_char()
            .await?
            .ok_or(EventParseError::UnexpectedEof)
    }

    async fn read_char(&mut self) -> Result<Option<char>, EventParseError> {
        let mut buf = [0u8; 4];
        if self.reader.read(&mut buf[..1]).await? == 0 {
            return Ok(None);
        }
        let width = utf8_width(buf[0]);
        if width > 1 {
            self.reader.read_exact(&mut buf[1..width]).await?;
        }
        let c = std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        Ok(Some(c))
    }
}

fn utf8_width(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}
