use crate::Result;
use std::io::Write;

/// Anything extracted text can be appended to.
pub trait TextSink {
    /// Append one fragment. Fragments arrive in document order.
    fn append(&mut self, fragment: &str) -> Result<()>;
}

impl TextSink for String {
    fn append(&mut self, fragment: &str) -> Result<()> {
        self.push_str(fragment);
        Ok(())
    }
}

/// Keeps every fragment separately, which makes block boundaries visible.
impl TextSink for Vec<String> {
    fn append(&mut self, fragment: &str) -> Result<()> {
        self.push(fragment.to_owned());
        Ok(())
    }
}

impl<S: TextSink + ?Sized> TextSink for &mut S {
    fn append(&mut self, fragment: &str) -> Result<()> {
        (**self).append(fragment)
    }
}

/// Writes fragments as UTF-8 to any [`std::io::Write`].
#[derive(Debug)]
pub struct IoSink<W: Write> {
    writer: W,
}

impl<W: Write> IoSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush and hand back the writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> TextSink for IoSink<W> {
    fn append(&mut self, fragment: &str) -> Result<()> {
        self.writer.write_all(fragment.as_bytes())?;
        Ok(())
    }
}
