/// Produces decoded bitmaps for image keys on worker threads.
///
/// The cache hooks let a producer with its own disk tier take part in cache
/// maintenance; they default to no-ops.
pub trait BitmapProducer: Send + Sync {
    /// Produce the bitmap for `key`, or `None` if it cannot be obtained.
    ///
    /// May block on disk and network I/O.
    fn produce(&self, key: &str) -> Option<thumbgrid_decode::Bitmap>;

    fn init_disk_cache(&self) {}

    fn clear_cache(&self) {}

    fn flush_cache(&self) {}

    fn close_cache(&self) {}
}
