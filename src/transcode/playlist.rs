//! VOD playlist generation.

use std::fmt::Write;

/// Build the m3u8 document for a fixed-duration VOD asset.
///
/// Segments step through `video_duration` in `segment_duration` strides;
/// the final segment is clamped to the remaining duration so the declared
/// lengths sum exactly to `video_duration`. Segment URLs are built as
/// `<public_path_prefix>/<file_name_prefix>-<n>.ts` with `n` starting at 0.
///
/// The declared target duration is `round(segment_duration) + 1`; the +1
/// buffers against encoder rounding so no segment nominally exceeds it.
pub fn build_vod_playlist(
    video_duration: f64,
    segment_duration: f64,
    file_name_prefix: &str,
    public_path_prefix: &str,
) -> String {
    let mut out = String::new();

    writeln!(out, "#EXTM3U").unwrap();
    writeln!(out, "#EXT-X-VERSION:4").unwrap();
    writeln!(out, "#EXT-X-PLAYLIST-TYPE:VOD").unwrap();
    writeln!(out, "#EXT-X-TARGETDURATION:{}", target_duration(segment_duration)).unwrap();
    writeln!(out, "#EXT-X-ALLOW-CACHE:YES").unwrap();
    writeln!(out, "#EXT-X-MEDIA-SEQUENCE:0").unwrap();

    let mut sequence = 0u64;
    let mut offset = 0.0_f64;
    while offset < video_duration {
        let remaining = video_duration - offset;
        let length = if remaining < segment_duration {
            remaining
        } else {
            segment_duration
        };

        writeln!(out, "#EXTINF:{length:.6},").unwrap();
        writeln!(out, "{public_path_prefix}/{file_name_prefix}-{sequence}.ts").unwrap();

        sequence += 1;
        offset += segment_duration;
    }

    write!(out, "#EXT-X-ENDLIST").unwrap();
    out
}

fn target_duration(segment_duration: f64) -> u64 {
    segment_duration.round() as u64 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment_durations(playlist: &str) -> Vec<f64> {
        playlist
            .lines()
            .filter_map(|l| l.strip_prefix("#EXTINF:"))
            .map(|l| l.trim_end_matches(',').parse().unwrap())
            .collect()
    }

    #[test]
    fn twenty_five_seconds_in_tens() {
        let playlist = build_vod_playlist(25.0, 10.0, "prefix", "/transcode/abc");

        assert_eq!(
            playlist,
            "#EXTM3U\n\
             #EXT-X-VERSION:4\n\
             #EXT-X-PLAYLIST-TYPE:VOD\n\
             #EXT-X-TARGETDURATION:11\n\
             #EXT-X-ALLOW-CACHE:YES\n\
             #EXT-X-MEDIA-SEQUENCE:0\n\
             #EXTINF:10.000000,\n\
             /transcode/abc/prefix-0.ts\n\
             #EXTINF:10.000000,\n\
             /transcode/abc/prefix-1.ts\n\
             #EXTINF:5.000000,\n\
             /transcode/abc/prefix-2.ts\n\
             #EXT-X-ENDLIST"
        );
    }

    #[test]
    fn segment_count_is_ceiling_of_duration_ratio() {
        for (video, segment, expected) in [
            (25.0, 10.0, 3),
            (30.0, 10.0, 3),
            (10.0, 3.0, 4),
            (9.0, 3.0, 3),
            (0.5, 10.0, 1),
        ] {
            let playlist = build_vod_playlist(video, segment, "p", "/t");
            let count = segment_durations(&playlist).len();
            assert_eq!(count, expected, "video={video} segment={segment}");
        }
    }

    #[test]
    fn segment_durations_sum_to_video_duration() {
        let playlist = build_vod_playlist(25.0, 10.0, "p", "/t");
        let durations = segment_durations(&playlist);
        assert_eq!(durations.iter().sum::<f64>(), 25.0);
    }

    #[test]
    fn final_segment_never_exceeds_segment_duration() {
        for video in [7.0, 12.0, 19.5, 30.0] {
            let playlist = build_vod_playlist(video, 10.0, "p", "/t");
            let durations = segment_durations(&playlist);
            assert!(*durations.last().unwrap() <= 10.0);
        }
    }

    #[test]
    fn zero_duration_emits_no_segments() {
        let playlist = build_vod_playlist(0.0, 10.0, "p", "/t");
        assert!(segment_durations(&playlist).is_empty());
        assert!(playlist.ends_with("#EXT-X-ENDLIST"));
    }

    #[test]
    fn target_duration_rounds_then_adds_one() {
        assert_eq!(target_duration(10.0), 11);
        assert_eq!(target_duration(6.4), 7);
        assert_eq!(target_duration(6.5), 8);
    }

    #[test]
    fn sequence_numbers_increment_from_zero() {
        let playlist = build_vod_playlist(30.0, 10.0, "seg", "/t/x");
        assert!(playlist.contains("/t/x/seg-0.ts"));
        assert!(playlist.contains("/t/x/seg-1.ts"));
        assert!(playlist.contains("/t/x/seg-2.ts"));
        assert!(!playlist.contains("/t/x/seg-3.ts"));
    }
}
