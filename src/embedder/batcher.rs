// batcher.rs - splits record streams into request-sized batches

pub struct Batcher {
    batch_size: usize,
}

impl Batcher {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn split<'a, T>(&self, items: &'a [T]) -> Vec<&'a [T]> {
        items.chunks(self.batch_size).collect()
    }
}
