pub mod http_transport;

pub use http_transport::{
    encode_segment, HttpTransport, LoggingInterceptor, RawResponse, RequestBody, RequestContext,
    RequestOptions, ResponseInterceptor,
};
