use padboard_ocr::{Config, Engine, Recognition};
use pyo3::{create_exception, exceptions::PyException, prelude::*, types::PyDict, PyErr};

create_exception!(pypadboard_ocr, PadBoardException, PyException);

fn process_result(res: &Recognition, config: &Config, py: Python) -> PyResult<PyObject> {
    let links = res.links(config);
    let b = res.board_area;
    let dict = PyDict::new(py);
    dict.set_item("board", res.encoded())?;
    dict.set_item("color_board", res.color_board.encode())?;
    dict.set_item("links", vec![links.dawnglare, links.miruglare])?;
    dict.set_item("agrees", res.agrees())?;
    dict.set_item("board_area", (b.x, b.y, b.width, b.height))?;
    dict.set_item("profile", res.profile.clone())?;
    Ok(dict.into())
}

/// Wrapper around padboard_ocr::Error so we convert to PyErr
struct PadBoardError(padboard_ocr::Error);

impl From<padboard_ocr::Error> for PadBoardError {
    fn from(err: padboard_ocr::Error) -> PadBoardError {
        PadBoardError(err)
    }
}

impl From<PadBoardError> for PyErr {
    fn from(err: PadBoardError) -> PyErr {
        PyErr::new::<PadBoardException, String>(err.0.to_string())
    }
}

fn runtime() -> PyResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PyErr::new::<PadBoardException, String>(e.to_string()))
}

#[pyclass]
struct PadBoard {
    engine: Engine,
}

#[pymethods]
impl PadBoard {
    #[new]
    fn new(data_dir: Option<String>) -> Self {
        let config = match data_dir {
            Some(dir) => Config::with_data_dir(dir),
            None => Config::default(),
        };
        PadBoard {
            engine: Engine::new(config),
        }
    }

    fn classify(&self, screenshot: &[u8], py: Python) -> PyResult<PyObject> {
        let res = py
            .allow_threads(|| self.engine.classify(screenshot))
            .map_err(PadBoardError::from)?;
        process_result(&res, self.engine.config(), py)
    }

    fn reload_templates(&self, bundle: &[u8]) -> PyResult<usize> {
        Ok(self
            .engine
            .reload_templates(bundle)
            .map_err(PadBoardError::from)?)
    }

    fn reload_color_table(&self, table: &[u8]) -> PyResult<usize> {
        Ok(self
            .engine
            .reload_color_table(table)
            .map_err(PadBoardError::from)?)
    }

    fn download_templates(&self, url: String, py: Python) -> PyResult<usize> {
        let rt = runtime()?;
        Ok(py
            .allow_threads(|| rt.block_on(self.engine.download_templates(&url)))
            .map_err(PadBoardError::from)?)
    }

    fn download_color_table(&self, url: String, py: Python) -> PyResult<usize> {
        let rt = runtime()?;
        Ok(py
            .allow_threads(|| rt.block_on(self.engine.download_color_table(&url)))
            .map_err(PadBoardError::from)?)
    }
}

#[pymodule]
fn pypadboard_ocr(py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PadBoard>()?;
    m.add("PadBoardException", py.get_type::<PadBoardException>())?;
    Ok(())
}
