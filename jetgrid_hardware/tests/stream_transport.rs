use jetgrid_hardware::StreamTransport;
use jetgrid_hardware::error::HwError;
use jetgrid_traits::Transport;
use std::io::Cursor;
use std::time::Duration;

const T: Duration = Duration::from_millis(200);

#[test]
fn query_writes_command_and_returns_reply() {
    let replies = Cursor::new(b"Loading\r\nsimplex_001\n".to_vec());
    let mut link = StreamTransport::new(replies, Vec::new());
    assert_eq!(link.query("load", T).unwrap(), "Loading");
    assert_eq!(link.query("simplex_001", T).unwrap(), "simplex_001");
}

#[test]
fn end_of_stream_reports_closed() {
    let mut link = StreamTransport::new(Cursor::new(b"only\n".to_vec()), Vec::new());
    assert_eq!(link.read_line(T).unwrap(), "only");
    let err = link.read_line(T).unwrap_err();
    assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::Closed)));
}

#[test]
fn open_device_fails_for_missing_path() {
    let res = jetgrid_hardware::open_device(std::path::Path::new("/nonexistent/ttyACM9"));
    assert!(matches!(res, Err(HwError::Io(_))));
}

#[test]
fn boxed_transport_forwards_writes_and_reads() {
    let mut link: Box<dyn Transport> =
        Box::new(StreamTransport::new(Cursor::new(b"7\n".to_vec()), Vec::new()));
    link.write_bytes(&[0x32, 0x00, 0x00, 0x00, 0x1E, 0xFF]).unwrap();
    assert_eq!(link.read_line(T).unwrap(), "7");
    let err = link.read_line(T).unwrap_err();
    assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::Closed)));
}
