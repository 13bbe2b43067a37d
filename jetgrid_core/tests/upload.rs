use jetgrid_core::codec::unpack_pcs;
use jetgrid_core::{GenError, PcsCoordinate, Uploader, WireFrame};
use jetgrid_hardware::SimulatedDevice;
use jetgrid_traits::Transport;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

fn frames(n: usize) -> Vec<WireFrame> {
    (0..n)
        .map(|i| WireFrame {
            duration_ms: 50,
            points: if i % 2 == 0 {
                vec![PcsCoordinate::new(-6, 7), PcsCoordinate::new(0, 1)]
            } else {
                vec![]
            },
        })
        .collect()
}

fn gen_error(err: &eyre::Report) -> Option<&GenError> {
    err.downcast_ref::<GenError>()
}

#[test]
fn upload_to_simulated_device() {
    let sent = frames(5);
    let mut up = Uploader::new(SimulatedDevice::new());
    let report = up.upload("simplex_001", &sent, None).unwrap();
    assert_eq!(report.frames_sent, 5);
    assert_eq!(report.bytes_sent, 3 * 7 + 2 * 5 + 1);

    let dev = up.into_inner();
    let program = dev.program().unwrap();
    assert_eq!(program.name, "simplex_001");
    assert_eq!(program.frames.len(), 5);
    for (loaded, wire) in program.frames.iter().zip(&sent) {
        assert_eq!(loaded.duration_ms, wire.duration_ms);
        let pts: Vec<PcsCoordinate> = loaded.points.iter().map(|&b| unpack_pcs(b)).collect();
        assert_eq!(pts, wire.points);
    }
}

#[test]
fn too_many_frames_rejected_before_sending() {
    let mut up = Uploader::new(SimulatedDevice::new());
    let err = up.upload("big", &frames(5001), None).unwrap_err();
    assert!(matches!(gen_error(&err), Some(GenError::Config(_))));
    assert_eq!(up.into_inner().bytes_received(), 0);
}

#[test]
fn device_error_reply_is_fatal() {
    let mut up = Uploader::new(SimulatedDevice::new().fail_at_frame(2));
    let err = up.upload("p", &frames(4), None).unwrap_err();
    match gen_error(&err) {
        Some(GenError::Device(msg)) => assert!(msg.starts_with("ERROR")),
        other => panic!("expected Device, got {other:?}"),
    }
    assert!(up.into_inner().program().is_none());
}

#[test]
fn device_capacity_error_on_count() {
    let mut up = Uploader::new(SimulatedDevice::new().with_max_frames(2));
    let err = up.upload("p", &frames(3), None).unwrap_err();
    assert!(matches!(gen_error(&err), Some(GenError::Device(_))));
}

#[test]
fn abort_flag_stops_between_frames() {
    let flag = AtomicBool::new(true);
    let mut up = Uploader::new(SimulatedDevice::new());
    let err = up.upload("p", &frames(3), Some(&flag)).unwrap_err();
    assert!(matches!(gen_error(&err), Some(GenError::Aborted)));
}

#[test]
fn bad_name_is_rejected() {
    let mut up = Uploader::new(SimulatedDevice::new());
    assert!(up.upload("", &frames(1), None).is_err());
    assert!(up.upload("a\nb", &frames(1), None).is_err());
}

/// Scripted link: fixed replies, records writes.
struct Scripted {
    replies: VecDeque<&'static str>,
    writes: Vec<Vec<u8>>,
}

impl Transport for Scripted {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.writes.push(data.to_vec());
        Ok(())
    }

    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.replies
            .pop_front()
            .map(str::to_string)
            .ok_or_else(|| "read timeout".into())
    }
}

#[test]
fn silent_device_maps_to_timeout() {
    let link = Scripted {
        replies: VecDeque::from(["Loading", "p", "1"]),
        writes: Vec::new(),
    };
    let mut up = Uploader::new(link).with_timeout(Duration::from_millis(5));
    let err = up.upload("p", &frames(1), None).unwrap_err();
    assert!(matches!(gen_error(&err), Some(GenError::Timeout)));

    let writes = up.into_inner().writes;
    assert_eq!(writes[0], b"load\n");
    assert_eq!(writes[1], b"p\n");
    assert_eq!(writes[2], b"1\n");
    assert_eq!(writes[3].last(), Some(&0xFF));
}

#[test]
fn echo_mismatch_is_reported() {
    let link = Scripted {
        replies: VecDeque::from(["Loading", "other"]),
        writes: Vec::new(),
    };
    let err = Uploader::new(link)
        .upload("p", &frames(1), None)
        .unwrap_err();
    assert!(matches!(gen_error(&err), Some(GenError::Device(_))));
}

#[test]
fn missing_success_reply_fails() {
    let link = Scripted {
        replies: VecDeque::from(["Loading", "p", "1", "1", "Done"]),
        writes: Vec::new(),
    };
    let err = Uploader::new(link)
        .upload("p", &frames(1), None)
        .unwrap_err();
    assert!(matches!(gen_error(&err), Some(GenError::Device(_))));
}
