use std::io::{self, Read};

use indicatif::{ProgressBar, ProgressBarIter, ProgressStyle};

/// Reader that draws upload progress on stderr. The bytes read are untouched.
pub struct ProgressReader<R: Read> {
    inner: ProgressBarIter<R>,
    bar: ProgressBar,
}

/// Wrap `reader` of `len` bytes with a progress bar.
pub fn wrap<R: Read>(reader: R, len: u64) -> ProgressReader<R> {
    let bar = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("[{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    ProgressReader {
        inner: bar.wrap_read(reader),
        bar,
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.bar.finish();
        }
        Ok(n)
    }
}
