use crate::media::VideoMetadata;

/// Renders the user-facing report for one processed video. Pure; the
/// metadata is already formatted for display.
pub fn render_summary(metadata: &VideoMetadata) -> String {
    format!(
        "🎥 Анализ видео:\n\n\
         ⏱ Длительность: {} сек\n\
         📐 Разрешение: {}\n\
         🎞 FPS: {}\n\n\
         ✅ Видео успешно обработано и готово к использованию!",
        metadata.duration, metadata.resolution, metadata.fps
    )
}
