use axum::response::Html;

const UPLOAD_FORM: &str = r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Upload a PDF</title>
  </head>
  <body>
    <form ref="uploadForm"
      id="uploadForm"
      action="/upload"
      method="post"
      encType="multipart/form-data">
        <input type="file" name="pdf" />
        <input type="submit" value="Upload!" />
    </form>
  </body>
</html>
"#;

pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}
