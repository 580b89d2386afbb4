/// Supplies frames in capture order.
///
/// `Ok(None)` means the stream is exhausted. Implementations handle the
/// device, container and codec details and hand out RGB [`Frame`]s.
///
/// [`Frame`]: crate::shared::frame::Frame
pub trait FrameSource {
    fn next_frame(
        &mut self,
    ) -> Result<Option<crate::shared::frame::Frame>, Box<dyn std::error::Error>>;
}
