use reqwest::blocking::Client as HttpClient;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

pub const SERVICE_ACCOUNT_PEM: &str = include_str!("../testdata/service-account-key.pem");

pub fn http() -> HttpClient {
    HttpClient::builder().no_proxy().build().expect("client")
}

pub struct Captured {
    pub request_line: String,
    pub headers: Vec<String>,
    pub body: String,
}

impl Captured {
    pub fn has_header(&self, header: &str) -> bool {
        self.headers.iter().any(|line| line == header)
    }
}

pub fn serve_once(status_line: &str, body: &str) -> (String, mpsc::Receiver<Captured>) {
    serve(&[(status_line, body)])
}

// Answers one connection per canned reply, in order, then stops listening.
// Headers come back lowercased.
pub fn serve(replies: &[(&str, &str)]) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::channel();
    let responses: Vec<String> = replies
        .iter()
        .map(|(status_line, body)| {
            format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
        })
        .collect();
    thread::spawn(move || {
        for response in responses {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            let mut headers = Vec::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                let line = line.trim_end().to_string();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
                headers.push(line.to_ascii_lowercase());
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("body");
            let mut stream = stream;
            stream.write_all(response.as_bytes()).expect("write");
            stream.flush().ok();
            let _ = tx.send(Captured {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
    });
    (format!("http://{addr}"), rx)
}
