#![cfg(all(unix, feature = "cli"))]

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use dxlink::frame::{encode, encode_position, StreamDecoder};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/dxlink-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn spawn_dxlink(args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_dxlink"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("dxlink should start")
}

fn accept_within(listener: &UnixListener, timeout: Duration) -> UnixStream {
    listener
        .set_nonblocking(true)
        .expect("listener should switch to nonblocking");
    let start = Instant::now();
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream
                    .set_nonblocking(false)
                    .expect("stream should switch to blocking");
                stream
                    .set_read_timeout(Some(Duration::from_secs(5)))
                    .expect("read timeout should apply");
                return stream;
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                if start.elapsed() >= timeout {
                    panic!("dxlink never connected");
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(err) => panic!("accept failed: {err}"),
        }
    }
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn send_writes_one_reference_frame() {
    let dir = unique_temp_dir("send");
    let sock_path = dir.join("arm.sock");
    let listener = UnixListener::bind(&sock_path).expect("bind should succeed");

    let child = spawn_dxlink(&["send", sock_path.to_str().unwrap(), "150.5", "300", "1"]);
    let mut stream = accept_within(&listener, Duration::from_secs(3));

    let mut received = [0u8; 16];
    stream.read_exact(&mut received).expect("frame should arrive");
    assert_eq!(
        received.as_slice(),
        encode_position(0x01, 150.5, 300.0, 1).unwrap().as_ref()
    );

    let output = child.wait_with_output().expect("send should finish");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(json_lines(&output)[0]["direction"], "tx");
}

#[test]
fn send_over_socket_accepts_any_line_settings() {
    let dir = unique_temp_dir("send-line");
    let sock_path = dir.join("arm.sock");
    let listener = UnixListener::bind(&sock_path).expect("bind should succeed");

    let child = spawn_dxlink(&[
        "send",
        sock_path.to_str().unwrap(),
        "10",
        "20",
        "0",
        "--baud",
        "250000",
        "--data-bits",
        "7",
        "--parity",
        "O",
        "--stop-bits",
        "1.5",
    ]);
    let mut stream = accept_within(&listener, Duration::from_secs(3));

    let mut received = [0u8; 16];
    stream.read_exact(&mut received).expect("frame should arrive");
    assert_eq!(
        received.as_slice(),
        encode_position(0x01, 10.0, 20.0, 0).unwrap().as_ref()
    );

    let output = child.wait_with_output().expect("send should finish");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn send_repeat_emits_each_frame() {
    let dir = unique_temp_dir("repeat");
    let sock_path = dir.join("arm.sock");
    let listener = UnixListener::bind(&sock_path).expect("bind should succeed");

    let child = spawn_dxlink(&[
        "send",
        sock_path.to_str().unwrap(),
        "10",
        "20",
        "0",
        "--cmd",
        "0x05",
        "--repeat",
        "3",
        "--interval",
        "1ms",
    ]);
    let mut stream = accept_within(&listener, Duration::from_secs(3));

    let mut received = vec![0u8; 48];
    stream.read_exact(&mut received).expect("three frames should arrive");
    let frames = StreamDecoder::new().feed(&received);
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.cmd() == 0x05));

    let output = child.wait_with_output().expect("send should finish");
    assert!(output.status.success());
    assert_eq!(json_lines(&output).len(), 3);
}

#[test]
fn send_wait_prints_response() {
    let dir = unique_temp_dir("wait");
    let sock_path = dir.join("arm.sock");
    let listener = UnixListener::bind(&sock_path).expect("bind should succeed");

    let child = spawn_dxlink(&["send", sock_path.to_str().unwrap(), "1", "2", "1", "--wait"]);
    let mut stream = accept_within(&listener, Duration::from_secs(3));

    let mut received = [0u8; 16];
    stream.read_exact(&mut received).expect("frame should arrive");
    let mut reply = vec![0x00, 0xFF];
    reply.extend_from_slice(&encode(0x81, b"OK").unwrap());
    stream.write_all(&reply).expect("reply should be written");

    let output = child.wait_with_output().expect("send should finish");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["direction"], "rx");
    assert_eq!(lines[1]["cmd"], 0x81);
    assert_eq!(lines[1]["payload"], "4F 4B");
}

#[test]
fn send_wait_times_out_without_reply() {
    let dir = unique_temp_dir("wait-timeout");
    let sock_path = dir.join("arm.sock");
    let listener = UnixListener::bind(&sock_path).expect("bind should succeed");

    let child = spawn_dxlink(&[
        "send",
        sock_path.to_str().unwrap(),
        "1",
        "2",
        "1",
        "--wait",
        "--wait-timeout",
        "200ms",
    ]);
    let _stream = accept_within(&listener, Duration::from_secs(3));

    let output = child.wait_with_output().expect("send should finish");
    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn send_to_missing_port_is_transport_error() {
    let dir = unique_temp_dir("missing");
    let output = Command::new(env!("CARGO_BIN_EXE_dxlink"))
        .args(["--log-level", "error", "send"])
        .arg(dir.join("nope"))
        .args(["1", "1", "1"])
        .output()
        .expect("dxlink should run");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn send_out_of_range_never_opens_port() {
    let dir = unique_temp_dir("range");
    let sock_path = dir.join("arm.sock");
    let _listener = UnixListener::bind(&sock_path).expect("bind should succeed");

    let output = Command::new(env!("CARGO_BIN_EXE_dxlink"))
        .args(["--log-level", "error", "send"])
        .arg(&sock_path)
        .args(["1001", "1", "1"])
        .output()
        .expect("dxlink should run");
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn listen_filters_and_counts_frames() {
    let dir = unique_temp_dir("listen");
    let sock_path = dir.join("arm.sock");
    let listener = UnixListener::bind(&sock_path).expect("bind should succeed");

    let child = spawn_dxlink(&[
        "listen",
        sock_path.to_str().unwrap(),
        "--count",
        "2",
        "--cmd",
        "01",
    ]);
    let mut stream = accept_within(&listener, Duration::from_secs(3));

    let mut traffic = vec![0x13, 0x37];
    traffic.extend_from_slice(&encode_position(0x02, 5.0, 5.0, 0).unwrap());
    traffic.extend_from_slice(&encode_position(0x01, 150.5, 300.0, 1).unwrap());
    traffic.extend_from_slice(&[0x58, 0x44, 0x00]);
    traffic.extend_from_slice(&encode_position(0x01, 75.0, 25.0, 0).unwrap());
    stream.write_all(&traffic).expect("traffic should be written");

    let output = child.wait_with_output().expect("listen should finish");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines = json_lines(&output);
    let frames: Vec<_> = lines.iter().filter(|l| l["type"] == "frame").collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["position"]["x"], 150.5);
    assert_eq!(frames[1]["position"]["x"], 75.0);
    assert_eq!(frames[1]["position"]["grip"], 0);

    let stats = lines.last().expect("stats line");
    assert_eq!(stats["type"], "stats");
    assert_eq!(stats["frames"], 3);
    assert_eq!(stats["discarded_bytes"], 5);
}

#[test]
fn listen_exits_when_remote_hangs_up() {
    let dir = unique_temp_dir("hangup");
    let sock_path = dir.join("arm.sock");
    let listener = UnixListener::bind(&sock_path).expect("bind should succeed");

    let child = spawn_dxlink(&["listen", sock_path.to_str().unwrap()]);
    let mut stream = accept_within(&listener, Duration::from_secs(3));
    stream
        .write_all(&encode_position(0x01, 1.0, 1.0, 1).unwrap())
        .expect("frame should be written");
    drop(stream);

    let output = child.wait_with_output().expect("listen should finish");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["frames"], 1);
}
